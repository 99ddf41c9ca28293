use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::catalogue::{CacheSettings, CatalogueKind, CatalogueSpec};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default = "default_catalogues")]
    pub catalogues: Vec<CatalogueSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Requests dated further ahead than this are rejected.
    #[serde(default = "default_max_future", deserialize_with = "deserialize_duration")]
    pub max_future: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_fetch_timeout", deserialize_with = "deserialize_duration")]
    pub fetch_timeout: Duration,
    #[serde(default = "default_retain_periods")]
    pub retain_periods: usize,
    #[serde(
        default = "default_fallback_lookback",
        deserialize_with = "deserialize_duration"
    )]
    pub fallback_lookback: Duration,
    #[serde(default)]
    pub fail_on_partial: bool,
}

fn default_bind() -> String {
    "0.0.0.0:8876".to_string()
}

fn default_max_future() -> Duration {
    Duration::from_secs(24 * 3600)
}

fn default_root() -> PathBuf {
    PathBuf::from("catalogue_cache")
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_retain_periods() -> usize {
    2
}

fn default_fallback_lookback() -> Duration {
    Duration::from_secs(7 * 86_400)
}

fn default_catalogues() -> Vec<CatalogueSpec> {
    vec![
        CatalogueSpec::standard(CatalogueKind::Sbas, 1.5e6),
        CatalogueSpec::standard(CatalogueKind::Gps, 1.5e6),
        CatalogueSpec::standard(CatalogueKind::Galileo, 1.5e6),
        CatalogueSpec::standard(CatalogueKind::Beidou, 1.5e6),
        CatalogueSpec::standard(CatalogueKind::Sun, 1.0e4),
    ]
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_future: default_max_future(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            fetch_timeout: default_fetch_timeout(),
            retain_periods: default_retain_periods(),
            fallback_lookback: default_fallback_lookback(),
            fail_on_partial: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web: WebConfig::default(),
            cache: CacheConfig::default(),
            catalogues: default_catalogues(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_yaml::from_str(content)?;
        config.fill_default_urls();
        config.validate()?;
        Ok(config)
    }

    fn fill_default_urls(&mut self) {
        for spec in &mut self.catalogues {
            if spec.url.is_none() {
                spec.url = spec.kind.default_url().map(String::from);
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for spec in &self.catalogues {
            if !seen.insert(spec.kind) {
                return Err(ConfigError::Invalid(format!(
                    "catalogue '{}' listed more than once",
                    spec.kind
                )));
            }
            if !spec.kind.is_computed() && spec.url.is_none() {
                return Err(ConfigError::Invalid(format!(
                    "catalogue '{}' has no url",
                    spec.kind
                )));
            }
            if !spec.jy.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "catalogue '{}' has a non-finite jy",
                    spec.kind
                )));
            }
        }
        if self.cache.retain_periods == 0 {
            return Err(ConfigError::Invalid("retain_periods must be at least 1".into()));
        }
        Ok(())
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            fetch_timeout: self.cache.fetch_timeout,
            retain_periods: self.cache.retain_periods,
            fallback_lookback_days: (self.cache.fallback_lookback.as_secs() / 86_400) as u32,
        }
    }
}
