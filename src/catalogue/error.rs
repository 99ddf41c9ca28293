use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use super::kind::CacheKey;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error("empty response body")]
    EmptyBody,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("TLE file read error: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Invalid TLE format in {file}: {message}")]
    InvalidTle { file: String, message: String },
    #[error("No satellites in {0}")]
    Empty(String),
}

#[derive(Debug, Error)]
#[error("propagation error: {0}")]
pub struct PropagationError(pub String);

impl From<sgp4::Error> for PropagationError {
    fn from(err: sgp4::Error) -> Self {
        PropagationError(err.to_string())
    }
}

/// Why a catalogue could not be produced for a key.
#[derive(Debug, Error)]
pub enum UnavailableCause {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("no catalogue file at {0}")]
    Missing(PathBuf),
    #[error("no download URL configured")]
    NoSource,
}

/// Shared between every caller that waited on the failed population.
#[derive(Debug, Clone, Error)]
pub enum CatalogueError {
    #[error("{key} catalogue unavailable: {source}")]
    Unavailable {
        key: CacheKey,
        source: Arc<UnavailableCause>,
    },
}
