//! Fakes shared by the catalogue and web tests.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::error::FetchError;
use super::fetcher::{write_atomic, RemoteFetcher};

pub const GPS_TLE: &str = include_str!("../../testdata/gps.tle");
pub const GALILEO_TLE: &str = include_str!("../../testdata/galileo.tle");

/// Serves a fixed body for every URL and counts calls.
pub struct FixtureFetcher {
    body: Option<&'static str>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FixtureFetcher {
    pub fn serving(body: &'static str) -> Self {
        Self {
            body: Some(body),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails with a 503.
    pub fn failing() -> Self {
        Self {
            body: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteFetcher for FixtureFetcher {
    async fn fetch(&self, _url: &str, destination: &Path) -> Result<(), FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.body {
            Some(body) => write_atomic(destination, body.as_bytes()).await,
            None => Err(FetchError::Status(503)),
        }
    }
}
