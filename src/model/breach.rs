use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One breach event attributed to an email address.
///
/// `exposed_data` is kept as free-form text rather than a typed enum so
/// that every source can carry whatever category tags it has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreachRecord {
    pub source_name: String,
    pub breach_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_date: Option<DateTime<Utc>>,
    pub exposed_data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pwn_count: Option<u64>,
    pub description: String,
}

impl BreachRecord {
    pub fn new(source_name: impl Into<String>, breach_date: DateTime<Utc>) -> Self {
        Self {
            source_name: source_name.into(),
            breach_date,
            added_date: None,
            exposed_data: String::new(),
            pwn_count: None,
            description: String::new(),
        }
    }

    pub fn with_added_date(mut self, added_date: DateTime<Utc>) -> Self {
        self.added_date = Some(added_date);
        self
    }

    pub fn with_exposed_data(mut self, exposed_data: impl Into<String>) -> Self {
        self.exposed_data = exposed_data.into();
        self
    }

    pub fn with_pwn_count(mut self, pwn_count: u64) -> Self {
        self.pwn_count = Some(pwn_count);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_builder_fills_optional_fields() {
        let date = Utc.with_ymd_and_hms(2019, 5, 1, 0, 0, 0).unwrap();
        let record = BreachRecord::new("ExampleDump", date)
            .with_exposed_data("password, ip")
            .with_pwn_count(5_000)
            .with_description("test dump");

        assert_eq!(record.source_name, "ExampleDump");
        assert_eq!(record.pwn_count, Some(5_000));
        assert!(record.added_date.is_none());
    }

    #[test]
    fn test_serializes_camel_case_and_skips_missing() {
        let date = Utc.with_ymd_and_hms(2019, 5, 1, 0, 0, 0).unwrap();
        let record = BreachRecord::new("ExampleDump", date);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["sourceName"], "ExampleDump");
        assert!(json.get("pwnCount").is_none());
        assert!(json.get("addedDate").is_none());
    }
}
