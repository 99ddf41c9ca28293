use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;

use super::error::{CatalogueError, FetchError, LoadError, UnavailableCause};
use super::fetcher::RemoteFetcher;
use super::kind::{CacheKey, CatalogueKind, CatalogueSpec};
use super::observer::Observer;
use super::parsed::{Ephemeris, ParsedCatalogue};
use super::store::CatalogueStore;
use super::sun::Sun;
use super::tle_loader;
use super::types::{AzElResult, PositionResult, Provenance};

#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Upper bound on a single download.
    pub fetch_timeout: Duration,
    /// Parsed catalogues kept in memory; the newest periods win.
    pub retain_periods: usize,
    /// Days searched backwards for an older usable file.
    pub fallback_lookback_days: u32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            retain_periods: 2,
            fallback_lookback_days: 7,
        }
    }
}

/// One refresh period. `ready` is set at most once. `population` serialises
/// attempts to fill it and holds the last failure, which is handed to every
/// caller that waited on the failed attempt.
#[derive(Default)]
struct PeriodSlot {
    ready: OnceCell<Arc<ParsedCatalogue>>,
    attempts: AtomicU64,
    population: tokio::sync::Mutex<Option<CatalogueError>>,
}

type Slot = Arc<PeriodSlot>;

/// Time-partitioned cache for one catalogue kind.
///
/// Each refresh period owns a slot. The first caller to find a slot empty
/// downloads (if needed) and parses the period's file while any concurrent
/// callers for the same period wait on the slot; callers for other periods
/// are not blocked. Once filled, a slot is read without further I/O.
pub struct CatalogueCache {
    spec: CatalogueSpec,
    store: Arc<CatalogueStore>,
    fetcher: Arc<dyn RemoteFetcher>,
    settings: CacheSettings,
    entries: Mutex<BTreeMap<NaiveDate, Slot>>,
}

impl CatalogueCache {
    pub fn new(
        spec: CatalogueSpec,
        store: Arc<CatalogueStore>,
        fetcher: Arc<dyn RemoteFetcher>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            spec,
            store,
            fetcher,
            settings,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn spec(&self) -> &CatalogueSpec {
        &self.spec
    }

    pub fn kind(&self) -> CatalogueKind {
        self.spec.kind
    }

    pub async fn get_catalogue(
        &self,
        date: DateTime<Utc>,
    ) -> Result<Arc<ParsedCatalogue>, CatalogueError> {
        let key = self.spec.key_for(date);
        let slot = self.slot(key.period_start);
        if let Some(parsed) = slot.ready.get() {
            return Ok(parsed.clone());
        }

        let attempts_seen = slot.attempts.load(Ordering::Acquire);
        let mut last_failure = slot.population.lock().await;
        if let Some(parsed) = slot.ready.get() {
            return Ok(parsed.clone());
        }
        if slot.attempts.load(Ordering::Acquire) != attempts_seen {
            if let Some(err) = last_failure.as_ref() {
                return Err(err.clone());
            }
        }

        let outcome = self.populate(key).await;
        match &outcome {
            Ok(parsed) => {
                let _ = slot.ready.set(parsed.clone());
                *last_failure = None;
            }
            Err(err) => *last_failure = Some(err.clone()),
        }
        slot.attempts.fetch_add(1, Ordering::Release);
        outcome
    }

    /// ECEF positions at the full `date` timestamp.
    pub async fn get_positions(
        &self,
        date: DateTime<Utc>,
    ) -> Result<Vec<PositionResult>, CatalogueError> {
        Ok(self.get_catalogue(date).await?.positions(date))
    }

    pub async fn get_az_el(
        &self,
        date: DateTime<Utc>,
        observer: &Observer,
        min_elevation_deg: f64,
    ) -> Result<Vec<AzElResult>, CatalogueError> {
        Ok(self
            .get_catalogue(date)
            .await?
            .az_el(date, observer, min_elevation_deg))
    }

    /// Slot for `period_start`, created on demand. Creating a slot evicts
    /// the oldest other periods beyond `retain_periods`, never the new one;
    /// callers already holding an evicted slot still complete against it.
    fn slot(&self, period_start: NaiveDate) -> Slot {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = entries.get(&period_start) {
            return slot.clone();
        }

        let slot = Slot::default();
        entries.insert(period_start, slot.clone());
        while entries.len() > self.settings.retain_periods.max(1) {
            let Some(evicted) = entries.keys().copied().find(|d| *d != period_start) else {
                break;
            };
            entries.remove(&evicted);
            log::debug!("Evicted {} catalogue for {}", self.spec.kind, evicted);
        }
        slot
    }

    async fn populate(&self, key: CacheKey) -> Result<Arc<ParsedCatalogue>, CatalogueError> {
        if self.spec.kind.is_computed() {
            let records: Vec<Box<dyn Ephemeris>> = vec![Box::new(Sun)];
            return Ok(Arc::new(ParsedCatalogue::new(
                key,
                self.spec.jy,
                Provenance::Computed,
                records,
            )));
        }

        let path = self.store.path_for(key.kind, key.period_start);
        let mut cause: Option<UnavailableCause> = None;
        let mut fetched = false;

        if self.needs_download(&path) {
            match self.spec.url_for(&key) {
                Some(url) => match self.download(&key, &url, &path).await {
                    Ok(()) => fetched = true,
                    Err(e) => cause = Some(e.into()),
                },
                None => cause = Some(UnavailableCause::NoSource),
            }
        }

        if self.store.exists(&path) {
            let provenance = match (&cause, fetched) {
                (Some(e), _) => Provenance::Stale {
                    reason: e.to_string(),
                },
                (None, true) => Provenance::Fresh,
                (None, false) => Provenance::Cached,
            };
            match self.load(key, &path, provenance).await {
                Ok(parsed) => return Ok(Arc::new(parsed)),
                Err(e) => {
                    log::warn!("Unusable catalogue file {}: {}", path.display(), e);
                    cause = Some(e.into());
                }
            }
        }

        if let Some((from, older)) = self.store.latest_before(
            key.kind,
            key.period_start,
            self.settings.fallback_lookback_days,
        ) {
            match self.load(key, &older, Provenance::Fallback { from }).await {
                Ok(parsed) => return Ok(Arc::new(parsed)),
                Err(e) => {
                    log::warn!("Unusable catalogue file {}: {}", older.display(), e);
                    cause.get_or_insert(e.into());
                }
            }
        }

        let source = cause.unwrap_or(UnavailableCause::Missing(path));
        log::error!("{} catalogue unavailable: {}", key, source);
        Err(CatalogueError::Unavailable {
            key,
            source: Arc::new(source),
        })
    }

    fn needs_download(&self, path: &Path) -> bool {
        if !self.store.exists(path) {
            return true;
        }
        match self.store.age(path) {
            Ok(age) => age > self.spec.refresh.max_age(),
            Err(_) => true,
        }
    }

    async fn download(&self, key: &CacheKey, url: &str, path: &Path) -> Result<(), FetchError> {
        log::info!("Downloading {} catalogue from {}", key, url);
        let result =
            match tokio::time::timeout(self.settings.fetch_timeout, self.fetcher.fetch(url, path))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout),
            };
        result.inspect_err(|e| log::warn!("Download of {} catalogue failed: {}", key, e))
    }

    async fn load(
        &self,
        key: CacheKey,
        path: &Path,
        provenance: Provenance,
    ) -> Result<ParsedCatalogue, LoadError> {
        let records = tle_loader::load_catalogue_file(path, &self.spec.name_filter).await?;

        if provenance.is_degraded() {
            log::warn!(
                "Serving {} catalogue from {}: {}",
                key,
                path.display(),
                provenance
            );
        } else {
            log::info!(
                "Loaded {} records for {} catalogue ({})",
                records.len(),
                key,
                provenance
            );
        }

        let records = records
            .into_iter()
            .map(|r| Box::new(r) as Box<dyn Ephemeris>)
            .collect();
        Ok(ParsedCatalogue::new(key, self.spec.jy, provenance, records))
    }

    #[cfg(test)]
    fn cached_periods(&self) -> Vec<NaiveDate> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }
}
