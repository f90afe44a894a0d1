//! Email breach exposure scanning with a bounded 0-100 risk score.
//!
//! A [`ScanService`] asks one [`BreachSource`](source::BreachSource) for the
//! breaches attributed to an address and scores them with a
//! [`ScoringPolicy`](risk::ScoringPolicy).

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod platform;
pub mod risk;
pub mod service;
pub mod source;
pub mod store;

pub use cache::Cache;
pub use config::Config;
pub use error::{Error, Result};
pub use model::{BreachRecord, ScanResult, ScanStatus, UserProfile};
pub use risk::{RiskLevel, ScoringPolicy};
pub use service::ScanService;
pub use store::{JsonFileStore, MemoryStore, ProfileStore, ScanStore};
