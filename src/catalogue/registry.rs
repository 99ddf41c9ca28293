use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

use super::cache::{CacheSettings, CatalogueCache};
use super::error::CatalogueError;
use super::fetcher::RemoteFetcher;
use super::kind::{CatalogueKind, CatalogueSpec};
use super::observer::Observer;
use super::store::CatalogueStore;
use super::types::{AzElResult, PositionResult};

/// A catalogue kind that contributed nothing to an aggregate.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct KindFailure {
    pub kind: CatalogueKind,
    pub message: String,
}

impl fmt::Display for KindFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

fn describe(failures: &[KindFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("all catalogues unavailable: {}", describe(.0))]
    AllFailed(Vec<KindFailure>),
    #[error("catalogues unavailable: {}", describe(.0))]
    Partial(Vec<KindFailure>),
}

impl RegistryError {
    pub fn into_failures(self) -> Vec<KindFailure> {
        match self {
            RegistryError::AllFailed(failures) | RegistryError::Partial(failures) => failures,
        }
    }
}

/// Concatenated results of every participating kind, in registry order,
/// plus the kinds that failed.
#[derive(Debug)]
pub struct Aggregate<T> {
    pub results: Vec<T>,
    pub failures: Vec<KindFailure>,
}

impl<T> Aggregate<T> {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// One cache per catalogue kind, queried together.
pub struct CatalogueRegistry {
    caches: Vec<CatalogueCache>,
    fail_on_partial: bool,
}

impl CatalogueRegistry {
    pub fn new(caches: Vec<CatalogueCache>, fail_on_partial: bool) -> Self {
        Self {
            caches,
            fail_on_partial,
        }
    }

    /// Build one cache per spec, all sharing a store and fetcher.
    pub fn from_specs(
        specs: Vec<CatalogueSpec>,
        store: Arc<CatalogueStore>,
        fetcher: Arc<dyn RemoteFetcher>,
        settings: CacheSettings,
        fail_on_partial: bool,
    ) -> Self {
        let caches = specs
            .into_iter()
            .map(|spec| {
                CatalogueCache::new(spec, store.clone(), fetcher.clone(), settings.clone())
            })
            .collect();
        Self::new(caches, fail_on_partial)
    }

    pub fn caches(&self) -> &[CatalogueCache] {
        &self.caches
    }

    /// ECEF positions from every kind that reports positions (not the sun).
    pub async fn aggregate_positions(
        &self,
        date: DateTime<Utc>,
    ) -> Result<Aggregate<PositionResult>, RegistryError> {
        let outcomes = join_all(
            self.caches
                .iter()
                .filter(|cache| cache.spec().reports_position())
                .map(|cache| async move { (cache.kind(), cache.get_positions(date).await) }),
        )
        .await;
        self.collect(outcomes)
    }

    pub async fn aggregate_az_el(
        &self,
        date: DateTime<Utc>,
        observer: &Observer,
        min_elevation_deg: f64,
    ) -> Result<Aggregate<AzElResult>, RegistryError> {
        let outcomes = join_all(self.caches.iter().map(|cache| async move {
            (
                cache.kind(),
                cache.get_az_el(date, observer, min_elevation_deg).await,
            )
        }))
        .await;
        self.collect(outcomes)
    }

    fn collect<T>(
        &self,
        outcomes: Vec<(CatalogueKind, Result<Vec<T>, CatalogueError>)>,
    ) -> Result<Aggregate<T>, RegistryError> {
        let participants = outcomes.len();
        let mut results = Vec::new();
        let mut failures = Vec::new();

        for (kind, outcome) in outcomes {
            match outcome {
                Ok(items) => results.extend(items),
                Err(e) => {
                    log::warn!("Omitting {} catalogue from aggregate: {}", kind, e);
                    failures.push(KindFailure {
                        kind,
                        message: e.to_string(),
                    });
                }
            }
        }

        if participants > 0 && failures.len() == participants {
            return Err(RegistryError::AllFailed(failures));
        }
        if self.fail_on_partial && !failures.is_empty() {
            return Err(RegistryError::Partial(failures));
        }
        Ok(Aggregate { results, failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::testing::{FixtureFetcher, GALILEO_TLE, GPS_TLE};
    use chrono::TimeZone;
    use std::path::Path;

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 12, 7, 9, 25, 55).unwrap()
    }

    fn cache(root: &Path, kind: CatalogueKind, fetcher: Arc<FixtureFetcher>) -> CatalogueCache {
        CatalogueCache::new(
            CatalogueSpec::standard(kind, 1.5e6),
            Arc::new(CatalogueStore::new(root.to_path_buf())),
            fetcher,
            CacheSettings::default(),
        )
    }

    #[tokio::test]
    async fn concatenates_in_registry_order() {
        let dir = tempfile::tempdir().unwrap();
        let registry = CatalogueRegistry::new(
            vec![
                cache(
                    dir.path(),
                    CatalogueKind::Galileo,
                    Arc::new(FixtureFetcher::serving(GALILEO_TLE)),
                ),
                cache(
                    dir.path(),
                    CatalogueKind::Gps,
                    Arc::new(FixtureFetcher::serving(GPS_TLE)),
                ),
                cache(dir.path(), CatalogueKind::Sun, Arc::new(FixtureFetcher::failing())),
            ],
            false,
        );

        let positions = registry.aggregate_positions(date()).await.unwrap();
        let names: Vec<_> = positions.results.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "GSAT0101 (PRN E11)",
                "GPS BIIR-2  (PRN 13)",
                "GPS BIIF-1  (PRN 25)"
            ]
        );
        assert!(!positions.is_partial());

        let observer = Observer::new(45.5, 170.5, 0.0).unwrap();
        let az_el = registry
            .aggregate_az_el(date(), &observer, -90.0)
            .await
            .unwrap();
        assert_eq!(az_el.results.len(), 4);
        assert_eq!(az_el.results[3].name, "Sun");
    }

    #[tokio::test]
    async fn failed_kind_is_reported_not_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let registry = CatalogueRegistry::new(
            vec![
                cache(
                    dir.path(),
                    CatalogueKind::Gps,
                    Arc::new(FixtureFetcher::serving(GPS_TLE)),
                ),
                cache(dir.path(), CatalogueKind::Beidou, Arc::new(FixtureFetcher::failing())),
            ],
            false,
        );

        let aggregate = registry.aggregate_positions(date()).await.unwrap();
        assert_eq!(aggregate.results.len(), 2);
        assert_eq!(aggregate.failures.len(), 1);
        assert_eq!(aggregate.failures[0].kind, CatalogueKind::Beidou);
        assert!(aggregate.failures[0].message.contains("beidou/2023-12-07"));
    }

    #[tokio::test]
    async fn strict_registry_fails_on_any_kind() {
        let dir = tempfile::tempdir().unwrap();
        let registry = CatalogueRegistry::new(
            vec![
                cache(
                    dir.path(),
                    CatalogueKind::Gps,
                    Arc::new(FixtureFetcher::serving(GPS_TLE)),
                ),
                cache(dir.path(), CatalogueKind::Beidou, Arc::new(FixtureFetcher::failing())),
            ],
            true,
        );

        let err = registry.aggregate_positions(date()).await.unwrap_err();
        assert!(matches!(err, RegistryError::Partial(ref f) if f.len() == 1));
    }

    #[tokio::test]
    async fn every_kind_failing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let failing = Arc::new(FixtureFetcher::failing());
        let registry = CatalogueRegistry::from_specs(
            vec![
                CatalogueSpec::standard(CatalogueKind::Sbas, 1.5e6),
                CatalogueSpec::standard(CatalogueKind::Gps, 1.5e6),
            ],
            Arc::new(CatalogueStore::new(dir.path().to_path_buf())),
            failing.clone(),
            CacheSettings::default(),
            false,
        );

        let err = registry.aggregate_positions(date()).await.unwrap_err();
        match err {
            RegistryError::AllFailed(failures) => {
                let kinds: Vec<_> = failures.iter().map(|f| f.kind).collect();
                assert_eq!(kinds, vec![CatalogueKind::Sbas, CatalogueKind::Gps]);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(failing.calls(), 2);
    }
}
