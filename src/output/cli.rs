use crate::model::{ScanResult, ScanStatus, UserProfile};
use crate::risk::{descriptor_severity, RiskLevel};
use anyhow::Result;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct BreachRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Breach Date")]
    breach_date: String,
    #[tabled(rename = "Accounts")]
    pwn_count: String,
    #[tabled(rename = "Exposed Data")]
    exposed: String,
    #[tabled(rename = "Severity")]
    severity: String,
}

#[derive(Tabled)]
struct ScanRow {
    #[tabled(rename = "Scan ID")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Breaches")]
    breaches: String,
}

pub fn print_cli_table(result: &ScanResult) -> Result<()> {
    println!("{}", render_table(result));
    Ok(())
}

/// Human-readable report: header, breach table and score line.
pub fn render_table(result: &ScanResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("\nEmail:   {}\n", result.email));
    out.push_str(&format!("Source:  {}\n", result.source));
    out.push_str(&format!(
        "Scanned: {}\n",
        result.scan_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(id) = &result.id {
        out.push_str(&format!("Scan ID: {}\n", id));
    }
    out.push('\n');

    match &result.status {
        ScanStatus::Unavailable { reason } => {
            out.push_str(&format!("Breach source unavailable: {}\n\n", reason));
            out.push_str("Risk: unknown (no data could be retrieved)\n");
            return out;
        }
        ScanStatus::Complete if result.breaches.is_empty() => {
            out.push_str("No breaches found.\n");
        }
        ScanStatus::Complete => {
            out.push_str(&format!("Found {} breaches:\n\n", result.breaches.len()));

            let mut breaches: Vec<_> = result.breaches.iter().collect();
            breaches.sort_by(|a, b| b.breach_date.cmp(&a.breach_date));

            let rows: Vec<BreachRow> = breaches
                .iter()
                .map(|b| BreachRow {
                    source: truncate(&b.source_name, 30),
                    breach_date: b.breach_date.format("%Y-%m-%d").to_string(),
                    pwn_count: b
                        .pwn_count
                        .map(format_count)
                        .unwrap_or_else(|| "-".to_string()),
                    exposed: truncate(&b.exposed_data, 45),
                    severity: descriptor_severity(&b.exposed_data).to_string(),
                })
                .collect();

            out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
            out.push('\n');
        }
    }

    out.push('\n');
    out.push_str(&format!(
        "Risk Score: {}/100 {} ({} policy)\n",
        result.risk_score,
        format_level(result.risk_level),
        result.policy
    ));
    out
}

/// Profile header followed by its scan history.
pub fn print_profile(profile: &UserProfile, scans: &[ScanResult]) -> Result<()> {
    println!();
    println!("Profile: {}", profile.id);
    println!("Email:   {}", profile.email);
    if let Some(name) = &profile.full_name {
        println!("Name:    {}", name);
    }
    println!(
        "Created: {}",
        profile.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    match profile.risk_score {
        Some(score) => println!(
            "Latest risk: {}/100 {}",
            score,
            format_level(RiskLevel::from_score(score))
        ),
        None => println!("Latest risk: not yet scanned"),
    }

    if scans.is_empty() {
        return Ok(());
    }

    println!();
    let rows: Vec<ScanRow> = scans
        .iter()
        .map(|s| ScanRow {
            id: s.id.clone().unwrap_or_else(|| "-".to_string()),
            date: s.scan_date.format("%Y-%m-%d %H:%M").to_string(),
            score: if s.status.is_complete() {
                s.risk_score.to_string()
            } else {
                "unknown".to_string()
            },
            breaches: s.breaches.len().to_string(),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}

fn format_level(level: RiskLevel) -> String {
    let code = match level {
        RiskLevel::High => "31",
        RiskLevel::Moderate => "33",
        RiskLevel::Low => "32",
    };
    format!("\x1b[{}m{}\x1b[0m", code, level.label().to_uppercase())
}

fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
