//! Interchangeable breach-data sources.
//!
//! This module provides the [`BreachSource`] trait and its implementations.
//! Which one a scan uses is decided once, from configuration, by
//! [`build_source`].
//!
//! # Available Sources
//!
//! | Source | Kind | Data |
//! |--------|------|------|
//! | [`RemoteBreachSource`] | `remote` | Breach API over HTTPS, needs an API key |
//! | [`OfflineDatasetSource`] | `offline` | Bundled or configured JSON dataset |
//! | [`LocalBreachSource`] | `local` | Flat email/severity table |
//! | [`SyntheticSource`] | `synthetic` | Deterministic generated breaches |
//!
//! # Example
//!
//! ```no_run
//! use breachrisk::source::{BreachSource, FetchOutcome, OfflineDatasetSource};
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = OfflineDatasetSource::bundled();
//!     match source.fetch("test@example.com").await {
//!         FetchOutcome::Found(breaches) => println!("{} breaches", breaches.len()),
//!         FetchOutcome::Unavailable(reason) => println!("unknown: {}", reason),
//!     }
//! }
//! ```

pub(crate) mod entry;
mod local;
mod offline;
mod remote;
mod synthetic;

pub use local::{LocalBreachSource, LocalSeverity};
pub use offline::OfflineDatasetSource;
pub use remote::{
    RemoteBreachSource, DEFAULT_API_KEY_HEADER, DEFAULT_BASE_URL, DEFAULT_RATE_LIMIT_MS,
    DEFAULT_TIMEOUT_SECS,
};
pub use synthetic::SyntheticSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::Cache;
use crate::config::Config;
use crate::error::Result;
use crate::model::BreachRecord;

/// Result of asking a source about one email.
///
/// Sources never fail outward. Anything that goes wrong while fetching
/// becomes `Unavailable`, which callers must not read as "no breaches".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(Vec<BreachRecord>),
    Unavailable(String),
}

impl FetchOutcome {
    pub fn is_available(&self) -> bool {
        matches!(self, FetchOutcome::Found(_))
    }

    /// Breaches found, or an empty list when the source was unavailable.
    pub fn into_breaches(self) -> Vec<BreachRecord> {
        match self {
            FetchOutcome::Found(breaches) => breaches,
            FetchOutcome::Unavailable(_) => Vec::new(),
        }
    }
}

/// A provider of breach records for an email address.
#[async_trait]
pub trait BreachSource: Send + Sync {
    /// Human-readable name, recorded on every scan result.
    fn name(&self) -> &'static str;

    fn kind(&self) -> SourceKind;

    /// Returns the breaches attributed to `email`, in source order.
    ///
    /// Matching is case-insensitive. Implementations log failures and
    /// report them as [`FetchOutcome::Unavailable`].
    async fn fetch(&self, email: &str) -> FetchOutcome;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Remote,
    Offline,
    Local,
    Synthetic,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Remote,
        SourceKind::Offline,
        SourceKind::Local,
        SourceKind::Synthetic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Remote => "remote",
            SourceKind::Offline => "offline",
            SourceKind::Local => "local",
            SourceKind::Synthetic => "synthetic",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SourceKind::Remote => "Breach API lookup (requires an API key)",
            SourceKind::Offline => "Bundled or configured JSON breach dataset",
            SourceKind::Local => "Flat email,severity breach table",
            SourceKind::Synthetic => "Deterministic generated breaches for demos",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "remote" | "api" | "hibp" => Ok(SourceKind::Remote),
            "offline" | "dataset" => Ok(SourceKind::Offline),
            "local" => Ok(SourceKind::Local),
            "synthetic" | "demo" => Ok(SourceKind::Synthetic),
            _ => Err(format!(
                "Unknown source: {}. Use: remote, offline, local, synthetic",
                s
            )),
        }
    }
}

/// Builds the source selected by `config.source`.
///
/// A remote source without an API key falls back to the offline dataset.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be constructed.
pub fn build_source(config: &Config) -> Result<Box<dyn BreachSource>> {
    match config.source {
        SourceKind::Remote => {
            if !config.remote.has_api_key() {
                warn!("no API key configured, using the offline breach dataset");
                return Ok(offline_source(config));
            }
            let mut source = RemoteBreachSource::from_config(&config.remote)?;
            if config.remote.use_cache {
                source = source.with_cache(Cache::with_ttl_hours(config.remote.cache_ttl_hours));
            }
            Ok(Box::new(source))
        }
        SourceKind::Offline => Ok(offline_source(config)),
        SourceKind::Local => Ok(Box::new(match &config.local.table_path {
            Some(path) => LocalBreachSource::from_path(path),
            None => LocalBreachSource::bundled(),
        })),
        SourceKind::Synthetic => Ok(Box::new(SyntheticSource::new())),
    }
}

fn offline_source(config: &Config) -> Box<dyn BreachSource> {
    Box::new(match &config.offline.dataset_path {
        Some(path) => OfflineDatasetSource::from_path(path),
        None => OfflineDatasetSource::bundled(),
    })
}
