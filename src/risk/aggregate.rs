//! Aggregation of breach records into a single 0-100 risk score.
//!
//! Two policies exist and never share arithmetic:
//!
//! | Policy | Formula |
//! |--------|---------|
//! | [`ScoringPolicy::Canonical`] | `min(15 * count, 60) + min(sum(severity), 40)` |
//! | [`ScoringPolicy::RecencyWeighted`] | `min(sum(15 * recency * weight), 100)` |
//!
//! The canonical policy is the default. The recency-weighted one must be
//! selected explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::severity::record_severity;
use crate::model::BreachRecord;

pub const MAX_SCORE: u8 = 100;

const COUNT_WEIGHT: u32 = 15;
const COUNT_CAP: u32 = 60;
const SEVERITY_CAP: u32 = 40;

const RECENCY_BASE: f64 = 15.0;
const WEIGHT_CAP: f64 = 3.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringPolicy {
    /// Breadth (breach count) and severity, separately capped at 60/40.
    #[default]
    Canonical,
    /// Per-breach base weighted by recency and descriptor sensitivity.
    RecencyWeighted,
}

impl ScoringPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringPolicy::Canonical => "canonical",
            ScoringPolicy::RecencyWeighted => "recency-weighted",
        }
    }

    /// Scores `breaches` as of `now`. Only the recency policy reads the clock.
    pub fn score(&self, breaches: &[BreachRecord], now: DateTime<Utc>) -> u8 {
        match self {
            ScoringPolicy::Canonical => aggregate(breaches),
            ScoringPolicy::RecencyWeighted => aggregate_recency_weighted(breaches, now),
        }
    }
}

impl std::fmt::Display for ScoringPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ScoringPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "canonical" => Ok(ScoringPolicy::Canonical),
            "recency-weighted" | "recency" => Ok(ScoringPolicy::RecencyWeighted),
            _ => Err(format!(
                "Unknown policy: {}. Use 'canonical' or 'recency-weighted'",
                s
            )),
        }
    }
}

/// Canonical score: count component plus severity component.
pub fn aggregate(breaches: &[BreachRecord]) -> u8 {
    if breaches.is_empty() {
        return 0;
    }

    let count = u32::try_from(breaches.len()).unwrap_or(u32::MAX);
    let count_component = count.saturating_mul(COUNT_WEIGHT).min(COUNT_CAP);

    let severity_component = breaches
        .iter()
        .map(record_severity)
        .fold(0u32, u32::saturating_add)
        .min(SEVERITY_CAP);

    let score = (count_component + severity_component).min(u32::from(MAX_SCORE));
    score as u8
}

/// Recency-weighted score.
pub fn aggregate_recency_weighted(breaches: &[BreachRecord], now: DateTime<Utc>) -> u8 {
    let total: f64 = breaches
        .iter()
        .map(|b| {
            RECENCY_BASE
                * recency_multiplier(b.breach_date, now)
                * sensitivity_weight(&b.exposed_data)
        })
        .sum();

    total.min(f64::from(MAX_SCORE)).max(0.0).round() as u8
}

/// 2.0 within 30 days, 1.5 within 180 days, 1.0 otherwise.
///
/// Elapsed days are floored at 1, so future-dated breaches count as recent.
pub fn recency_multiplier(breach_date: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days = (now - breach_date).num_days().max(1);
    match days {
        1..=30 => 2.0,
        31..=180 => 1.5,
        _ => 1.0,
    }
}

/// Sensitivity multiplier used by the recency policy, in `1.0..=3.0`.
pub fn sensitivity_weight(exposed_data: &str) -> f64 {
    if exposed_data.trim().is_empty() {
        return 1.0;
    }
    let data = exposed_data.to_lowercase();
    let contains_any = |needles: &[&str]| needles.iter().any(|n| data.contains(n));

    let mut weight: f64 = 1.0;
    if contains_any(&["password", "pwd", "hash"]) {
        weight += 0.8;
    }
    if contains_any(&["email", "username", "handle"]) {
        weight += 0.4;
    }
    if contains_any(&["phone", "address"]) {
        weight += 0.3;
    }
    if contains_any(&["ssn", "credit card", "cc", "token", "api key"]) {
        weight += 1.0;
    }

    weight.min(WEIGHT_CAP)
}
