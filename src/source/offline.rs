use std::fs;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use super::entry::{parse_entries, record_from_entry, Entry};
use super::{BreachSource, FetchOutcome, SourceKind};
use crate::model::normalize_email;

const BUNDLED_DATASET: &str = include_str!("../../data/breaches.json");

/// Breach lookups against a static JSON dataset.
///
/// The dataset is a JSON array of flat objects keyed `email`, `Name`,
/// `Description`, `BreachDate` and `PwnCount` (plus optional `AddedDate`
/// and `DataClasses`). Entries match on exact, case-insensitive email.
pub struct OfflineDatasetSource {
    entries: Result<Vec<Entry>, String>,
}

impl OfflineDatasetSource {
    /// Uses the dataset compiled into the binary.
    pub fn bundled() -> Self {
        Self::from_json(BUNDLED_DATASET)
    }

    /// Loads a dataset file. A missing or malformed file leaves the source
    /// unavailable instead of failing construction.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read breach dataset");
                Self {
                    entries: Err(format!("dataset {} unreadable: {}", path.display(), e)),
                }
            }
        }
    }

    pub fn from_json(json: &str) -> Self {
        let entries = match parse_entries(json) {
            Ok(entries) => {
                info!(entries = entries.len(), "loaded offline breach dataset");
                Ok(entries)
            }
            Err(e) => {
                warn!(error = %e, "failed to parse breach dataset");
                Err(format!("dataset is malformed: {}", e))
            }
        };
        Self { entries }
    }

    /// Number of entries loaded, 0 when the dataset failed to load.
    pub fn len(&self) -> usize {
        self.entries.as_ref().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn entry_email(entry: &Entry) -> Option<String> {
    entry.get("email")?.as_str().map(normalize_email)
}

#[async_trait]
impl BreachSource for OfflineDatasetSource {
    fn name(&self) -> &'static str {
        "Offline Breach Database"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Offline
    }

    async fn fetch(&self, email: &str) -> FetchOutcome {
        let entries = match &self.entries {
            Ok(entries) => entries,
            Err(reason) => return FetchOutcome::Unavailable(reason.clone()),
        };

        let email = normalize_email(email);
        let now = Utc::now();
        let breaches: Vec<_> = entries
            .iter()
            .filter(|e| entry_email(e).as_deref() == Some(email.as_str()))
            .map(|e| record_from_entry(e, now))
            .collect();

        debug!(matches = breaches.len(), "offline dataset lookup");
        FetchOutcome::Found(breaches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_bundled_dataset_matches_case_insensitively() {
        let source = OfflineDatasetSource::bundled();
        assert!(!source.is_empty());

        let breaches = source.fetch("TEST@example.com").await.into_breaches();
        let names: Vec<_> = breaches.iter().map(|b| b.source_name.as_str()).collect();
        assert_eq!(names, vec!["ExampleDump", "ExampleForum"]);
        assert_eq!(breaches[0].pwn_count, Some(5_000));
    }

    #[tokio::test]
    async fn test_unknown_email_is_clean() {
        let source = OfflineDatasetSource::bundled();
        let outcome = source.fetch("nobody@example.com").await;
        assert_eq!(outcome, FetchOutcome::Found(Vec::new()));
    }

    #[tokio::test]
    async fn test_match_is_exact() {
        let source = OfflineDatasetSource::from_json(
            r#"[{"email":"a@example.com","Name":"One"},{"email":"aa@example.com","Name":"Two"}]"#,
        );
        let breaches = source.fetch("a@example.com").await.into_breaches();
        assert_eq!(breaches.len(), 1);
        assert_eq!(breaches[0].source_name, "One");
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = OfflineDatasetSource::from_path(dir.path().join("missing.json"));

        assert!(source.is_empty());
        assert!(!source.fetch("test@example.com").await.is_available());
    }

    #[tokio::test]
    async fn test_malformed_file_is_unavailable() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"email\": ").unwrap();

        let source = OfflineDatasetSource::from_path(file.path());
        assert!(matches!(
            source.fetch("test@example.com").await,
            FetchOutcome::Unavailable(reason) if reason.contains("malformed")
        ));
    }

    #[tokio::test]
    async fn test_loads_dataset_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"email":"Dev@Corp.io","Name":"Intranet","BreachDate":"2020-01-01","PwnCount":"42"}}]"#
        )
        .unwrap();

        let source = OfflineDatasetSource::from_path(file.path());
        let breaches = source.fetch("dev@corp.io").await.into_breaches();
        assert_eq!(breaches.len(), 1);
        assert_eq!(breaches[0].pwn_count, Some(42));
    }
}
