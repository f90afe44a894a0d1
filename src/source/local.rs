use std::collections::HashMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{BreachSource, FetchOutcome, SourceKind};
use crate::model::{normalize_email, BreachRecord};

const BUNDLED_TABLE: &str = include_str!("../../data/breach-database.txt");

const SEPARATORS: [char; 3] = [',', ':', '|'];

/// Severity bucket attached to an email in the local table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalSeverity {
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

impl LocalSeverity {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => LocalSeverity::Low,
            "medium" => LocalSeverity::Medium,
            "high" => LocalSeverity::High,
            "critical" => LocalSeverity::Critical,
            _ => LocalSeverity::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LocalSeverity::Low => "low",
            LocalSeverity::Medium => "medium",
            LocalSeverity::High => "high",
            LocalSeverity::Critical => "critical",
            LocalSeverity::Unknown => "unknown",
        }
    }

    /// Exposure tags implied by the bucket, in descriptor form.
    fn exposed_data(&self) -> &'static str {
        match self {
            LocalSeverity::Critical => "password, credit card",
            LocalSeverity::High => "password",
            LocalSeverity::Medium => "phone",
            LocalSeverity::Low | LocalSeverity::Unknown => "email",
        }
    }
}

/// Membership lookups against a flat email table loaded once at startup.
///
/// Each non-comment line is `email,severity`, `email:<opaque>` or
/// `email|<opaque>`. Only the first separator counts. Emails not in the
/// table yield no records.
pub struct LocalBreachSource {
    table: Result<HashMap<String, LocalSeverity>, String>,
}

impl LocalBreachSource {
    /// Uses the table compiled into the binary.
    pub fn bundled() -> Self {
        Self::from_table(parse_table(BUNDLED_TABLE))
    }

    /// Loads a table file. An unreadable file leaves the source unavailable.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => Self::from_table(parse_table(&text)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read local breach table");
                Self {
                    table: Err(format!("breach table {} unreadable: {}", path.display(), e)),
                }
            }
        }
    }

    pub fn from_table(table: HashMap<String, LocalSeverity>) -> Self {
        info!(emails = table.len(), "loaded local breach table");
        Self { table: Ok(table) }
    }

    pub fn severity(&self, email: &str) -> Option<LocalSeverity> {
        self.table.as_ref().ok()?.get(&normalize_email(email)).copied()
    }

    pub fn is_breached(&self, email: &str) -> bool {
        self.severity(email).is_some()
    }

    pub fn len(&self) -> usize {
        self.table.as_ref().map(HashMap::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parses table text. Later lines win for repeated emails.
pub fn parse_table(text: &str) -> HashMap<String, LocalSeverity> {
    let mut table = HashMap::new();
    let mut skipped = 0usize;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some(idx) = line.find(SEPARATORS) else {
            skipped += 1;
            continue;
        };
        let email = normalize_email(&line[..idx]);
        if email.is_empty() {
            skipped += 1;
            continue;
        }

        let severity = if line[idx..].starts_with(',') {
            LocalSeverity::parse(&line[idx + 1..])
        } else {
            LocalSeverity::Unknown
        };
        table.insert(email, severity);
    }

    if skipped > 0 {
        debug!(skipped, "ignored malformed breach table lines");
    }
    table
}

#[async_trait]
impl BreachSource for LocalBreachSource {
    fn name(&self) -> &'static str {
        "Local Breach Database"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    async fn fetch(&self, email: &str) -> FetchOutcome {
        let table = match &self.table {
            Ok(table) => table,
            Err(reason) => return FetchOutcome::Unavailable(reason.clone()),
        };

        let email = normalize_email(email);
        let Some(severity) = table.get(&email) else {
            return FetchOutcome::Found(Vec::new());
        };

        let record = BreachRecord::new(self.name(), Utc::now())
            .with_exposed_data(format!(
                "severity:{}; {}",
                severity.as_str(),
                severity.exposed_data()
            ))
            .with_description(format!(
                "Listed in the local breach database with {} severity",
                severity.as_str()
            ));
        FetchOutcome::Found(vec![record])
    }
}
