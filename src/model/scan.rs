use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BreachRecord;
use crate::risk::{descriptor_severity, RiskLevel, ScoringPolicy};

/// Whether the consulted source actually answered.
///
/// An `Unavailable` scan has a zero score and no breaches, but it means
/// "unknown", not "clean".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScanStatus {
    Complete,
    Unavailable { reason: String },
}

impl ScanStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, ScanStatus::Complete)
    }
}

/// Output of one scan. Built once per request; only `id` is assigned later,
/// by the scan store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub email: String,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub policy: ScoringPolicy,
    #[serde(flatten)]
    pub status: ScanStatus,
    pub source: String,
    pub data_sources_checked: u32,
    pub breaches: Vec<BreachRecord>,
    pub scan_date: DateTime<Utc>,
}

impl ScanResult {
    pub fn new(
        email: impl Into<String>,
        source: impl Into<String>,
        policy: ScoringPolicy,
        status: ScanStatus,
        risk_score: u8,
        breaches: Vec<BreachRecord>,
    ) -> Self {
        let risk_score = risk_score.min(100);
        Self {
            id: None,
            email: email.into(),
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
            policy,
            status,
            source: source.into(),
            data_sources_checked: 1,
            breaches,
            scan_date: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn is_clean(&self) -> bool {
        self.status.is_complete() && self.breaches.is_empty()
    }

    /// Compact per-scan summary kept alongside stored scans.
    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            breach_count: self.breaches.len(),
            breaches: self
                .breaches
                .iter()
                .map(|b| BreachSummary {
                    source: b.source_name.clone(),
                    breach_date: b.breach_date,
                    added_date: b.added_date,
                    pwn_count: b.pwn_count,
                    severity: descriptor_severity(&b.exposed_data),
                    description: b.description.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub breach_count: usize,
    pub breaches: Vec<BreachSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreachSummary {
    pub source: String,
    pub breach_date: DateTime<Utc>,
    pub added_date: Option<DateTime<Utc>>,
    pub pwn_count: Option<u64>,
    pub severity: u32,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(exposed: &str) -> BreachRecord {
        BreachRecord::new("Dump", Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
            .with_exposed_data(exposed)
    }

    #[test]
    fn test_new_derives_level_and_single_source() {
        let result = ScanResult::new(
            "a@example.com",
            "Offline Breach Database",
            ScoringPolicy::Canonical,
            ScanStatus::Complete,
            70,
            vec![record("password")],
        );

        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.data_sources_checked, 1);
        assert!(result.id.is_none());
        assert!(!result.is_clean());
    }

    #[test]
    fn test_unavailable_is_not_clean() {
        let result = ScanResult::new(
            "a@example.com",
            "Remote Breach API",
            ScoringPolicy::Canonical,
            ScanStatus::Unavailable {
                reason: "timeout".to_string(),
            },
            0,
            Vec::new(),
        );

        assert!(!result.is_clean());
        assert_eq!(result.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_status_serializes_flat() {
        let result = ScanResult::new(
            "a@example.com",
            "Remote Breach API",
            ScoringPolicy::Canonical,
            ScanStatus::Unavailable {
                reason: "timeout".to_string(),
            },
            0,
            Vec::new(),
        );
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["reason"], "timeout");
        assert_eq!(json["riskScore"], 0);

        let back: ScanResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.status, result.status);
    }

    #[test]
    fn test_summary_reports_descriptor_severity() {
        let result = ScanResult::new(
            "a@example.com",
            "Offline Breach Database",
            ScoringPolicy::Canonical,
            ScanStatus::Complete,
            55,
            vec![record("password, phone"), record("")],
        );
        let summary = result.summary();

        assert_eq!(summary.breach_count, 2);
        assert_eq!(summary.breaches[0].severity, 35);
        assert_eq!(summary.breaches[1].severity, 0);
    }
}
