use crate::model::{ScanResult, ScanSummary};
use anyhow::Result;
use serde::Serialize;

/// A scan result with its breach summary attached.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    #[serde(flatten)]
    result: &'a ScanResult,
    risk_label: &'static str,
    risk_color: &'static str,
    summary: ScanSummary,
}

pub fn generate_json_string(result: &ScanResult) -> Result<String> {
    let report = JsonReport {
        result,
        risk_label: result.risk_level.label(),
        risk_color: result.risk_level.color(),
        summary: result.summary(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn print_json(result: &ScanResult) -> Result<()> {
    println!("{}", generate_json_string(result)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BreachRecord, ScanStatus};
    use crate::risk::ScoringPolicy;
    use chrono::Utc;

    #[test]
    fn test_json_report_fields() {
        let result = ScanResult::new(
            "a@example.com",
            "Offline Breach Database",
            ScoringPolicy::Canonical,
            ScanStatus::Complete,
            70,
            vec![BreachRecord::new("Dump", Utc::now()).with_exposed_data("password")],
        );
        let value: serde_json::Value =
            serde_json::from_str(&generate_json_string(&result).unwrap()).unwrap();

        assert_eq!(value["email"], "a@example.com");
        assert_eq!(value["riskScore"], 70);
        assert_eq!(value["riskLabel"], "High");
        assert_eq!(value["riskColor"], "red");
        assert_eq!(value["status"], "complete");
        assert_eq!(value["dataSourcesChecked"], 1);
        assert_eq!(value["summary"]["breachCount"], 1);
        assert_eq!(value["summary"]["breaches"][0]["severity"], 25);
    }
}
