use chrono::{Datelike, NaiveDate};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::kind::CatalogueKind;

/// Maps (kind, period start) to a file under the cache root.
///
/// Layout: `<root>/<kind dir>/<YYYY>/<MM>/<kind dir>_<YYYY-MM-DD>.tle`
pub struct CatalogueStore {
    root: PathBuf,
}

impl CatalogueStore {
    pub fn new(root: PathBuf) -> Self {
        CatalogueStore { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, kind: CatalogueKind, date: NaiveDate) -> PathBuf {
        self.root
            .join(kind.dir_name())
            .join(format!("{:04}", date.year()))
            .join(format!("{:02}", date.month()))
            .join(format!("{}_{}.tle", kind.dir_name(), date.format("%Y-%m-%d")))
    }

    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Time since the file was last written. Files stamped in the future
    /// report zero.
    pub fn age(&self, path: &Path) -> io::Result<Duration> {
        let modified = path.metadata()?.modified()?;
        Ok(SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default())
    }

    /// Newest existing file of `kind` dated strictly before `date`, looking
    /// back at most `lookback_days` days.
    pub fn latest_before(
        &self,
        kind: CatalogueKind,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Option<(NaiveDate, PathBuf)> {
        (1..=lookback_days)
            .filter_map(|days| date.checked_sub_days(chrono::Days::new(days.into())))
            .map(|d| (d, self.path_for(kind, d)))
            .find(|(_, path)| self.exists(path))
    }
}
