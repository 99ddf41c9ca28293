mod cache;
mod error;
mod fetcher;
mod geometry;
mod kind;
mod observer;
mod parsed;
mod registry;
mod store;
mod sun;
mod tle_loader;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheSettings, CatalogueCache};
pub use error::FetchError;
pub use fetcher::HttpFetcher;
pub use kind::{CatalogueKind, CatalogueSpec, RefreshPeriod};
pub use observer::{Observer, ObserverError};
pub use registry::{Aggregate, CatalogueRegistry, KindFailure, RegistryError};
pub use store::CatalogueStore;
pub use types::{AzElResult, PositionResult};
