//! Property-based tests for the scoring functions.

use super::aggregate::{aggregate, aggregate_recency_weighted};
use super::severity::{descriptor_severity, DESCRIPTOR_CAP};
use super::RiskLevel;
use crate::model::BreachRecord;
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

fn arb_descriptor() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("password"),
            Just("password_hash"),
            Just("credit card"),
            Just("phone"),
            Just("email"),
            Just("ip"),
            Just("address"),
            Just("usernames"),
            Just("genders"),
        ],
        0..6,
    )
    .prop_map(|tags| tags.join(", "))
}

fn arb_breach() -> impl Strategy<Value = BreachRecord> {
    (
        arb_descriptor(),
        prop::option::of(0u64..100_000_000),
        0i64..5_000,
    )
        .prop_map(|(exposed, pwn, age_days)| {
            let anchor = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            let mut record = BreachRecord::new("Generated", anchor - Duration::days(age_days))
                .with_exposed_data(exposed);
            record.pwn_count = pwn;
            record
        })
}

proptest! {
    #[test]
    fn canonical_score_is_bounded(breaches in prop::collection::vec(arb_breach(), 0..40)) {
        let score = aggregate(&breaches);
        prop_assert!(score <= 100);
        if breaches.is_empty() {
            prop_assert_eq!(score, 0);
        } else {
            prop_assert!(score >= 15);
        }
    }

    #[test]
    fn recency_score_is_bounded(breaches in prop::collection::vec(arb_breach(), 0..40)) {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        prop_assert!(aggregate_recency_weighted(&breaches, now) <= 100);
    }

    #[test]
    fn adding_a_breach_never_lowers_the_score(
        breaches in prop::collection::vec(arb_breach(), 0..10),
        extra in arb_breach(),
    ) {
        let before = aggregate(&breaches);
        let mut more = breaches.clone();
        more.push(extra);
        prop_assert!(aggregate(&more) >= before);
    }

    #[test]
    fn descriptor_severity_never_exceeds_cap(descriptor in ".{0,200}") {
        prop_assert!(descriptor_severity(&descriptor) <= DESCRIPTOR_CAP);
    }

    #[test]
    fn level_matches_thresholds(score in 0u8..=100) {
        let level = RiskLevel::from_score(score);
        let expected = if score <= 33 {
            RiskLevel::Low
        } else if score <= 66 {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        };
        prop_assert_eq!(level, expected);
    }
}
