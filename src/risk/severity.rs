//! Severity classification of exposed-data descriptors.
//!
//! Two independent contributions are computed per breach record:
//!
//! - a keyword-weighted descriptor severity, capped at [`DESCRIPTOR_CAP`]
//! - a scale severity derived from the pwn count
//!
//! Neither can fail; empty or unrecognized descriptors classify to 0.

use crate::model::BreachRecord;

/// Ceiling for a single record's descriptor severity.
pub const DESCRIPTOR_CAP: u32 = 40;

const CREDENTIAL_WEIGHT: u32 = 25;
const FINANCIAL_WEIGHT: u32 = 25;
const PHONE_WEIGHT: u32 = 10;
const CONTACT_WEIGHT: u32 = 5;

const FINANCIAL_MARKERS: &[&str] = &["credit card", "card", "bank", "iban", "financial"];

/// Exposure category recognized in a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exposure {
    Credentials,
    Financial,
    Phone,
    Email,
    Ip,
    Address,
}

impl Exposure {
    pub fn weight(&self) -> u32 {
        match self {
            Exposure::Credentials => CREDENTIAL_WEIGHT,
            Exposure::Financial => FINANCIAL_WEIGHT,
            Exposure::Phone => PHONE_WEIGHT,
            Exposure::Email | Exposure::Ip | Exposure::Address => CONTACT_WEIGHT,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Exposure::Credentials => "password",
            Exposure::Financial => "financial",
            Exposure::Phone => "phone",
            Exposure::Email => "email",
            Exposure::Ip => "ip",
            Exposure::Address => "address",
        }
    }
}

/// Lists the exposure categories present in a descriptor, each at most once.
///
/// Matching is plain substring search on the lowercased text, for `ip` as
/// much as for the other keywords, so "description" or "zip" also count as
/// an IP exposure.
pub fn exposures(exposed_data: &str) -> Vec<Exposure> {
    let lower = exposed_data.to_lowercase();
    let mut found = Vec::new();

    if lower.contains("password") {
        found.push(Exposure::Credentials);
    }
    if FINANCIAL_MARKERS.iter().any(|m| lower.contains(m)) {
        found.push(Exposure::Financial);
    }
    if lower.contains("phone") {
        found.push(Exposure::Phone);
    }
    if lower.contains("email") {
        found.push(Exposure::Email);
    }
    if lower.contains("ip") {
        found.push(Exposure::Ip);
    }
    if lower.contains("address") {
        found.push(Exposure::Address);
    }

    found
}

/// Additive keyword severity of a descriptor, capped at [`DESCRIPTOR_CAP`].
pub fn descriptor_severity(exposed_data: &str) -> u32 {
    let total: u32 = exposures(exposed_data).iter().map(Exposure::weight).sum();
    total.min(DESCRIPTOR_CAP)
}

/// Scale severity from the number of affected accounts.
pub fn pwn_severity(pwn_count: Option<u64>) -> u32 {
    match pwn_count {
        None | Some(0) => 0,
        Some(n) if n >= 50_000_000 => 15,
        Some(n) if n >= 1_000_000 => 10,
        Some(n) if n >= 10_000 => 5,
        Some(_) => 2,
    }
}

/// Combined per-record severity fed into the aggregator.
pub fn record_severity(record: &BreachRecord) -> u32 {
    descriptor_severity(&record.exposed_data) + pwn_severity(record.pwn_count)
}
