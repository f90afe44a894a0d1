//! Core data types for breach records, scans and profiles.
//!
//! - [`BreachRecord`] - One breach event attributed to an email
//! - [`ScanResult`] - Score, status and breach list produced by a scan
//! - [`ScanStatus`] - Whether the source answered or was unavailable
//! - [`UserProfile`] - A scanned person, owned by the profile store
//!
//! # Example
//!
//! ```
//! use breachrisk::model::{BreachRecord, ScanResult, ScanStatus};
//! use breachrisk::risk::ScoringPolicy;
//!
//! let breach = BreachRecord::new("ExampleDump", chrono::Utc::now())
//!     .with_exposed_data("email, password");
//! let result = ScanResult::new(
//!     "test@example.com",
//!     "Offline Breach Database",
//!     ScoringPolicy::Canonical,
//!     ScanStatus::Complete,
//!     45,
//!     vec![breach],
//! );
//!
//! println!("Found {} breaches", result.breaches.len());
//! ```

mod breach;
mod email;
mod profile;
mod scan;

pub use breach::*;
pub use email::*;
pub use profile::*;
pub use scan::*;
