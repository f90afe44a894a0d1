//! Mapping of breach-API-shaped JSON objects into [`BreachRecord`]s.
//!
//! The remote API and the offline dataset share the same field names
//! (`Name`, `Description`, `BreachDate`, `PwnCount`, ...). Fields are read
//! leniently: a missing or malformed value falls back to a default instead
//! of rejecting the entry.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};

use crate::model::BreachRecord;

pub(crate) type Entry = Map<String, Value>;

/// Parses a JSON array of objects. Non-object elements are skipped.
pub(crate) fn parse_entries(body: &str) -> serde_json::Result<Vec<Entry>> {
    let values: Vec<Value> = serde_json::from_str(body)?;
    Ok(values
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect())
}

pub(crate) fn record_from_entry(entry: &Entry, now: DateTime<Utc>) -> BreachRecord {
    let name = string_field(entry, "Name")
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());
    let description = string_field(entry, "Description").unwrap_or_default();
    let breach_date = string_field(entry, "BreachDate")
        .and_then(|s| parse_date(&s))
        .unwrap_or(now);
    let added_date = string_field(entry, "AddedDate").and_then(|s| parse_date(&s));

    let mut record = BreachRecord::new(name, breach_date)
        .with_description(description)
        .with_exposed_data(exposed_data(entry));
    record.added_date = added_date;
    record.pwn_count = pwn_count(entry);
    record
}

/// `DataClasses` joined with ", " when present, else the raw entry JSON.
fn exposed_data(entry: &Entry) -> String {
    match entry.get("DataClasses") {
        Some(Value::Array(classes)) => {
            let tags: Vec<&str> = classes.iter().filter_map(Value::as_str).collect();
            if !tags.is_empty() {
                return tags.join(", ");
            }
        }
        Some(Value::String(tags)) if !tags.trim().is_empty() => return tags.clone(),
        _ => {}
    }
    Value::Object(entry.clone()).to_string()
}

fn string_field(entry: &Entry, key: &str) -> Option<String> {
    match entry.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn pwn_count(entry: &Entry) -> Option<u64> {
    match entry.get("PwnCount")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or RFC 3339 timestamps.
pub(crate) fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
