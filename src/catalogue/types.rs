use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

/// Position of one object in the Earth-fixed frame
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PositionResult {
    pub name: String,
    /// ECEF position in metres
    #[schema(value_type = Vec<f64>)]
    pub ecef: [f64; 3],
    /// ECEF velocity in metres per second
    #[schema(value_type = Vec<f64>)]
    pub ecef_dot: [f64; 3],
    pub jy: f64,
}

/// Local horizontal coordinates of one object
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AzElResult {
    pub name: String,
    /// Range in metres
    pub r: f64,
    pub el: f64,
    pub az: f64,
    pub jy: f64,
}

/// Where the data behind a parsed catalogue came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Provenance {
    /// Downloaded while populating this entry
    Fresh,
    /// Existing file still inside its refresh period
    Cached,
    /// Download failed; the existing file for this key was used
    Stale { reason: String },
    /// Nothing usable for this key; an older period's file was used
    Fallback { from: NaiveDate },
    Computed,
}

impl Provenance {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Provenance::Stale { .. } | Provenance::Fallback { .. })
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Fresh => write!(f, "fresh"),
            Provenance::Cached => write!(f, "cached"),
            Provenance::Stale { reason } => write!(f, "stale ({})", reason),
            Provenance::Fallback { from } => write!(f, "fallback from {}", from),
            Provenance::Computed => write!(f, "computed"),
        }
    }
}
