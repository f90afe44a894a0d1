//! Error type shared by the library.
//!
//! Breach sources never surface these: a failed fetch is reported as
//! [`FetchOutcome::Unavailable`](crate::source::FetchOutcome::Unavailable).
//! Errors here cover validation, lookups, persistence and setup.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The email was rejected before any source was consulted.
    #[error("invalid email address '{email}': {reason}")]
    InvalidEmail { email: String, reason: &'static str },

    /// A profile or scan identifier does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("risk score must be between 0 and 100, got {0}")]
    ScoreOutOfRange(i64),

    /// A bundled or configured dataset could not be loaded.
    #[error("failed to load {what}: {reason}")]
    Dataset { what: &'static str, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = Error::not_found("scan", "abc123");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "scan not found: abc123");
    }

    #[test]
    fn test_invalid_email_message() {
        let err = Error::InvalidEmail {
            email: "nope".to_string(),
            reason: "missing '@'",
        };
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "invalid email address 'nope': missing '@'");
    }
}
