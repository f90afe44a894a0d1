//! Scan orchestration.
//!
//! [`ScanService`] ties one breach source to a scoring policy and,
//! optionally, to the persistence collaborators. A scan validates the
//! email, asks the source once, scores whatever came back and tags the
//! result with whether the source actually answered.
//!
//! # Example
//!
//! ```no_run
//! use breachrisk::service::ScanService;
//! use breachrisk::source::OfflineDatasetSource;
//!
//! #[tokio::main]
//! async fn main() -> breachrisk::Result<()> {
//!     let service = ScanService::new(Box::new(OfflineDatasetSource::bundled()));
//!     let result = service.perform_scan("test@example.com").await?;
//!     println!("{} ({})", result.risk_score, result.risk_level);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{validate_email, ScanResult, ScanStatus, UserProfile};
use crate::risk::ScoringPolicy;
use crate::source::{build_source, BreachSource, FetchOutcome};
use crate::store::{ProfileStore, ScanStore};

/// A profile together with the scan that refreshed it.
#[derive(Debug, Clone)]
pub struct ProfileScan {
    pub profile: UserProfile,
    pub scan: ScanResult,
}

pub struct ScanService {
    source: Box<dyn BreachSource>,
    policy: ScoringPolicy,
    scans: Option<Arc<dyn ScanStore>>,
    profiles: Option<Arc<dyn ProfileStore>>,
}

impl ScanService {
    pub fn new(source: Box<dyn BreachSource>) -> Self {
        Self {
            source,
            policy: ScoringPolicy::default(),
            scans: None,
            profiles: None,
        }
    }

    /// Builds the configured source and policy. Stores are attached separately.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(build_source(config)?).with_policy(config.policy))
    }

    pub fn with_policy(mut self, policy: ScoringPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_scan_store(mut self, store: Arc<dyn ScanStore>) -> Self {
        self.scans = Some(store);
        self
    }

    pub fn with_profile_store(mut self, store: Arc<dyn ProfileStore>) -> Self {
        self.profiles = Some(store);
        self
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub fn policy(&self) -> ScoringPolicy {
        self.policy
    }

    /// Scans one email and persists the result when a scan store is attached.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidEmail`] before the source is consulted, or a store
    /// error while saving. An unreachable source is not an error: the result
    /// comes back with [`ScanStatus::Unavailable`] and a score of 0.
    pub async fn perform_scan(&self, email: &str) -> Result<ScanResult> {
        let email = validate_email(email)?;

        let (status, breaches) = match self.source.fetch(&email).await {
            FetchOutcome::Found(breaches) => (ScanStatus::Complete, breaches),
            FetchOutcome::Unavailable(reason) => {
                warn!(source = self.source.name(), %reason, "breach source unavailable");
                (ScanStatus::Unavailable { reason }, Vec::new())
            }
        };

        let score = self.policy.score(&breaches, Utc::now());
        let mut result = ScanResult::new(
            email,
            self.source.name(),
            self.policy,
            status,
            score,
            breaches,
        );

        if let Some(store) = &self.scans {
            result = store.save_scan(result)?;
        }

        info!(
            email = %result.email,
            score = result.risk_score,
            breaches = result.breaches.len(),
            complete = result.status.is_complete(),
            "scan finished"
        );
        Ok(result)
    }

    /// Finds or creates the profile for `email`, scans it and records the
    /// score on the profile.
    ///
    /// An unavailable scan leaves the profile's previous score in place.
    pub async fn scan_profile(&self, email: &str, full_name: Option<&str>) -> Result<ProfileScan> {
        let profiles = self
            .profiles
            .as_ref()
            .ok_or_else(|| Error::Config("no profile store attached".to_string()))?;

        let email = validate_email(email)?;
        let mut profile = profiles.find_or_create(&email, full_name)?;
        let scan = self.perform_scan(&profile.email).await?;

        if scan.status.is_complete() {
            profile = profiles.update_risk_score(&profile.id, i64::from(scan.risk_score))?;
        }

        Ok(ProfileScan { profile, scan })
    }

    pub fn get_scan(&self, id: &str) -> Result<ScanResult> {
        match &self.scans {
            Some(store) => store.get_scan(id),
            None => Err(Error::not_found("scan", id)),
        }
    }
}
