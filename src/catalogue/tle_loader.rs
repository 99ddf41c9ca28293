use std::path::Path;

use sgp4::{Constants, Elements};

use super::error::LoadError;
use super::parsed::SatelliteRecord;

/// Load a catalogue file, keeping only records matching `name_filter`
/// (all records when the filter is empty).
pub async fn load_catalogue_file(
    path: &Path,
    name_filter: &[String],
) -> Result<Vec<SatelliteRecord>, LoadError> {
    let content = tokio::fs::read_to_string(path).await?;
    let filename = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    parse_catalogue(&content, &filename, name_filter)
}

/// Parse TLE text. Any invalid element set rejects the whole file; a file
/// yielding no satellites is rejected as well.
pub fn parse_catalogue(
    content: &str,
    filename: &str,
    name_filter: &[String],
) -> Result<Vec<SatelliteRecord>, LoadError> {
    let mut results = Vec::new();

    for set in element_sets(content) {
        let name = set.name.map(str::to_string);
        let elements = Elements::from_tle(name.clone(), set.line1.as_bytes(), set.line2.as_bytes())
            .map_err(|e| LoadError::InvalidTle {
                file: filename.to_string(),
                message: e.to_string(),
            })?;

        let constants = Constants::from_elements(&elements).map_err(|e| LoadError::InvalidTle {
            file: filename.to_string(),
            message: e.to_string(),
        })?;

        let sat_name = name.unwrap_or_else(|| format!("NORAD {}", elements.norad_id));
        if !name_filter.is_empty() && !name_filter.iter().any(|n| sat_name.contains(n.as_str())) {
            continue;
        }

        results.push(SatelliteRecord::new(sat_name, elements, constants));
    }

    if results.is_empty() {
        return Err(LoadError::Empty(filename.to_string()));
    }

    Ok(results)
}

/// One element set as it appears in a catalogue file.
struct ElementLines<'a> {
    name: Option<&'a str>,
    line1: &'a str,
    line2: &'a str,
}

fn is_element_line(line: &str, number: char) -> bool {
    line.strip_prefix(number).is_some_and(|rest| rest.starts_with(' '))
}

/// Split catalogue text into element sets. Sets may be preceded by a name
/// line; lines belonging to no set are skipped.
fn element_sets(content: &str) -> Vec<ElementLines<'_>> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut sets = Vec::new();
    let mut rest = lines.as_slice();
    loop {
        rest = match rest {
            [line1, line2, tail @ ..]
                if is_element_line(line1, '1') && is_element_line(line2, '2') =>
            {
                sets.push(ElementLines {
                    name: None,
                    line1: *line1,
                    line2: *line2,
                });
                tail
            }
            [name, line1, line2, tail @ ..]
                if is_element_line(line1, '1') && is_element_line(line2, '2') =>
            {
                sets.push(ElementLines {
                    name: Some(*name),
                    line1: *line1,
                    line2: *line2,
                });
                tail
            }
            [_, tail @ ..] => tail,
            [] => break,
        };
    }
    sets
}
