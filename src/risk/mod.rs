//! Breach risk scoring.
//!
//! - [`severity`] classifies exposed-data descriptors and breach scale
//! - [`aggregate`] turns a set of breach records into a 0-100 score
//! - [`RiskLevel`] maps a score to a label and color
//!
//! # Example
//!
//! ```
//! use breachrisk::model::BreachRecord;
//! use breachrisk::risk::{aggregate, risk_label};
//!
//! let breaches = vec![
//!     BreachRecord::new("ExampleDump", chrono::Utc::now())
//!         .with_exposed_data("password, ip")
//!         .with_pwn_count(5_000),
//! ];
//!
//! let score = aggregate(&breaches);
//! assert_eq!(score, 47);
//! assert_eq!(risk_label(score), "Moderate");
//! ```

pub mod aggregate;
mod level;
pub mod severity;

#[cfg(test)]
mod proptest;

pub use aggregate::{aggregate, aggregate_recency_weighted, ScoringPolicy, MAX_SCORE};
pub use level::{risk_color, risk_label, RiskLevel};
pub use severity::{descriptor_severity, pwn_severity, record_severity};
