use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use utoipa::ToSchema;

const DAY: Duration = Duration::from_secs(86_400);

/// Identity of one catalogue served by the registry.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    ToSchema,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CatalogueKind {
    Sbas,
    Gps,
    Galileo,
    Beidou,
    Sun,
}

impl CatalogueKind {
    /// Sub-directory of the cache root holding this kind's files.
    pub fn dir_name(&self) -> &'static str {
        match self {
            CatalogueKind::Sbas => "norad_sbas",
            CatalogueKind::Gps => "norad_gps",
            CatalogueKind::Galileo => "norad_galileo",
            CatalogueKind::Beidou => "norad_beidou",
            CatalogueKind::Sun => "sun",
        }
    }

    /// Celestrak group URL used when the configuration does not override it.
    pub fn default_url(&self) -> Option<&'static str> {
        match self {
            CatalogueKind::Sbas => {
                Some("https://celestrak.org/NORAD/elements/gp.php?GROUP=SBAS&FORMAT=TLE")
            }
            CatalogueKind::Gps => {
                Some("https://celestrak.org/NORAD/elements/gp.php?GROUP=GPS-OPS&FORMAT=TLE")
            }
            CatalogueKind::Galileo => {
                Some("https://celestrak.org/NORAD/elements/gp.php?GROUP=GALILEO&FORMAT=TLE")
            }
            CatalogueKind::Beidou => {
                Some("https://celestrak.org/NORAD/elements/gp.php?GROUP=BEIDOU&FORMAT=TLE")
            }
            CatalogueKind::Sun => None,
        }
    }

    /// Computed kinds have no elements file and are never downloaded.
    pub fn is_computed(&self) -> bool {
        matches!(self, CatalogueKind::Sun)
    }
}

/// Granularity at which a downloaded catalogue stays valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPeriod {
    #[default]
    Day,
    Month,
    Year,
}

impl RefreshPeriod {
    /// First calendar date of the period containing `date`.
    pub fn truncate(&self, date: DateTime<Utc>) -> NaiveDate {
        let day = date.date_naive();
        let truncated = match self {
            RefreshPeriod::Day => Some(day),
            RefreshPeriod::Month => NaiveDate::from_ymd_opt(day.year(), day.month(), 1),
            RefreshPeriod::Year => NaiveDate::from_ymd_opt(day.year(), 1, 1),
        };
        // the first day of an existing month/year always exists
        truncated.unwrap_or(day)
    }

    /// File age beyond which the catalogue is downloaded again.
    pub fn max_age(&self) -> Duration {
        match self {
            RefreshPeriod::Day => DAY,
            RefreshPeriod::Month => DAY * 31,
            RefreshPeriod::Year => DAY * 366,
        }
    }
}

/// Cache key: the catalogue kind plus the first date of its refresh period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub kind: CatalogueKind,
    pub period_start: NaiveDate,
}

impl CacheKey {
    pub fn new(kind: CatalogueKind, period: RefreshPeriod, date: DateTime<Utc>) -> Self {
        Self {
            kind,
            period_start: period.truncate(date),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.period_start.format("%Y-%m-%d"))
    }
}

fn default_jy() -> f64 {
    1.5e6
}

/// Configuration of one catalogue: where it comes from and how it is tagged.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogueSpec {
    pub kind: CatalogueKind,
    /// URL template; `{date}` is replaced with the period start as `YYYY-MM-DD`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub refresh: RefreshPeriod,
    /// Signal strength tag (Jansky) attached to every result of this kind.
    #[serde(default = "default_jy")]
    pub jy: f64,
    /// Keep only records whose name contains one of these substrings.
    #[serde(default)]
    pub name_filter: Vec<String>,
}

impl CatalogueSpec {
    /// Spec using the built-in URL for `kind`.
    pub fn standard(kind: CatalogueKind, jy: f64) -> Self {
        Self {
            kind,
            url: kind.default_url().map(String::from),
            refresh: RefreshPeriod::Day,
            jy,
            name_filter: Vec::new(),
        }
    }

    pub fn key_for(&self, date: DateTime<Utc>) -> CacheKey {
        CacheKey::new(self.kind, self.refresh, date)
    }

    /// Download URL for `key`, or `None` for computed kinds.
    pub fn url_for(&self, key: &CacheKey) -> Option<String> {
        if self.kind.is_computed() {
            return None;
        }
        self.url.as_ref().map(|template| {
            template.replace("{date}", &key.period_start.format("%Y-%m-%d").to_string())
        })
    }

    /// Whether this kind contributes to ECEF position listings.
    pub fn reports_position(&self) -> bool {
        !self.kind.is_computed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn same_day_maps_to_same_key() {
        let morning = Utc.with_ymd_and_hms(2023, 12, 7, 0, 0, 1).unwrap();
        let evening = Utc.with_ymd_and_hms(2023, 12, 7, 23, 59, 59).unwrap();
        let next = Utc.with_ymd_and_hms(2023, 12, 8, 0, 0, 0).unwrap();

        let a = CacheKey::new(CatalogueKind::Gps, RefreshPeriod::Day, morning);
        let b = CacheKey::new(CatalogueKind::Gps, RefreshPeriod::Day, evening);
        let c = CacheKey::new(CatalogueKind::Gps, RefreshPeriod::Day, next);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "gps/2023-12-07");
    }

    #[test]
    fn coarser_periods_truncate_to_first_day() {
        let date = Utc.with_ymd_and_hms(2023, 12, 7, 9, 25, 55).unwrap();
        assert_eq!(
            RefreshPeriod::Month.truncate(date),
            NaiveDate::from_ymd_opt(2023, 12, 1).unwrap()
        );
        assert_eq!(
            RefreshPeriod::Year.truncate(date),
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
        );
    }

    #[test]
    fn url_template_substitutes_date() {
        let mut spec = CatalogueSpec::standard(CatalogueKind::Gps, 1.5e6);
        spec.url = Some("https://example.org/{date}.tle".into());
        let key = spec.key_for(Utc.with_ymd_and_hms(2023, 12, 7, 9, 0, 0).unwrap());
        assert_eq!(
            spec.url_for(&key).as_deref(),
            Some("https://example.org/2023-12-07.tle")
        );

        let sun = CatalogueSpec::standard(CatalogueKind::Sun, 1.0e4);
        assert_eq!(sun.url_for(&key), None);
        assert!(!sun.reports_position());
    }
}
