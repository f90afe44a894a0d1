use anyhow::{Context, Result};
use breachrisk::{
    cache::Cache,
    config::Config,
    model::{validate_email, ScanResult},
    output::{format_result_to_string, print_profile, print_result, OutputFormat},
    risk::{RiskLevel, ScoringPolicy},
    service::ScanService,
    source::SourceKind,
    store::{profile_id, JsonFileStore, ProfileStore, ScanStore},
};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const HIGH_RISK: u8 = 2;
    pub const MODERATE_RISK: u8 = 3;
    pub const LOW_RISK: u8 = 4;
    pub const RISK_UNKNOWN: u8 = 5;
}

#[derive(Parser)]
#[command(name = "breachrisk")]
#[command(
    author,
    version,
    about = "Check an email address against breach data and score the exposure"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan an email address for breaches
    Scan {
        /// Email address to check
        email: String,

        /// Full name recorded on a newly created profile
        #[arg(short, long)]
        name: Option<String>,

        /// Breach source (remote, offline, local, synthetic)
        #[arg(short, long)]
        source: Option<String>,

        /// Scoring policy (canonical, recency-weighted)
        #[arg(short, long)]
        policy: Option<String>,

        /// Output format (table, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Write output to file
        #[arg(short, long)]
        output: Option<String>,

        /// Don't persist the scan or update the profile
        #[arg(long)]
        no_save: bool,

        /// Exit non-zero if the risk level is at or above this level
        #[arg(long, value_enum)]
        fail_on: Option<FailLevel>,
    },

    /// Show a stored scan
    Show {
        /// Scan identifier printed by `scan`
        scan_id: String,

        /// Output format (table, json)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Show the stored profile and scan history for an email
    Profile {
        email: String,
    },

    /// List breach sources and their configuration
    Sources,

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Clear cached API responses
    ClearCache,
}

#[derive(Clone, Copy, ValueEnum)]
enum FailLevel {
    Low,
    Moderate,
    High,
}

impl FailLevel {
    fn threshold(self) -> RiskLevel {
        match self {
            FailLevel::Low => RiskLevel::Low,
            FailLevel::Moderate => RiskLevel::Moderate,
            FailLevel::High => RiskLevel::High,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

/// Logs go to stderr so JSON on stdout stays parseable.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(command: Commands) -> Result<u8> {
    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %format!("{:#}", e), "ignoring unreadable config file");
        Config::default()
    });

    match command {
        Commands::Scan {
            email,
            name,
            source,
            policy,
            format,
            output,
            no_save,
            fail_on,
        } => {
            let mut config = config;
            if let Some(source) = source {
                config.source = SourceKind::from_str(&source).map_err(|e| anyhow::anyhow!(e))?;
            }
            if let Some(policy) = policy {
                config.policy =
                    ScoringPolicy::from_str(&policy).map_err(|e| anyhow::anyhow!(e))?;
            }
            let format = format.unwrap_or_else(|| config.default_format.clone());
            let save = config.save_scans && !no_save;

            run_scan(&config, &email, name.as_deref(), &format, output, save, fail_on).await
        }
        Commands::Show { scan_id, format } => {
            let format = parse_format(&format.unwrap_or(config.default_format))?;
            let scan = JsonFileStore::default_location().get_scan(&scan_id)?;
            print_result(&scan, format)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::Profile { email } => {
            let email = validate_email(&email)?;
            let store = JsonFileStore::default_location();
            let profile = store
                .get_profile(&profile_id(&email))
                .with_context(|| format!("no profile for {}; run 'breachrisk scan' first", email))?;
            let scans = store.list_scans(&email)?;
            print_profile(&profile, &scans)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::Sources => {
            list_sources(&config);
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::ClearCache => {
            let removed = Cache::with_ttl_hours(config.remote.cache_ttl_hours).clear()?;
            println!("Cache cleared ({} entries removed).", removed);
            Ok(exit_codes::SUCCESS)
        }
    }
}

async fn run_scan(
    config: &Config,
    email: &str,
    name: Option<&str>,
    format: &str,
    output_file: Option<String>,
    save: bool,
    fail_on: Option<FailLevel>,
) -> Result<u8> {
    let format = parse_format(format)?;
    let is_interactive = format == OutputFormat::Table;

    let mut service = ScanService::from_config(config)?;
    if save {
        let store = Arc::new(JsonFileStore::default_location());
        service = service
            .with_scan_store(store.clone())
            .with_profile_store(store);
    }

    let progress = if is_interactive {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Checking {}...", service.source_name()));
        Some(pb)
    } else {
        None
    };

    let scan = if save {
        service.scan_profile(email, name).await.map(|p| p.scan)
    } else {
        service.perform_scan(email).await
    };

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let result = scan?;

    if let Some(path) = output_file {
        std::fs::write(&path, format_result_to_string(&result, format)?)?;
        if is_interactive {
            println!("Results written to: {}", path);
        }
    } else {
        print_result(&result, format)?;
    }

    Ok(determine_exit_code(&result, fail_on))
}

/// Unknown risk always fails; otherwise only breached results at or above
/// `--fail-on` do.
fn determine_exit_code(result: &ScanResult, fail_on: Option<FailLevel>) -> u8 {
    if !result.status.is_complete() {
        return exit_codes::RISK_UNKNOWN;
    }

    let Some(fail_on) = fail_on else {
        return exit_codes::SUCCESS;
    };
    if result.breaches.is_empty() || result.risk_level < fail_on.threshold() {
        return exit_codes::SUCCESS;
    }

    match result.risk_level {
        RiskLevel::High => exit_codes::HIGH_RISK,
        RiskLevel::Moderate => exit_codes::MODERATE_RISK,
        RiskLevel::Low => exit_codes::LOW_RISK,
    }
}

fn parse_format(s: &str) -> Result<OutputFormat> {
    OutputFormat::from_str(s).map_err(|e| anyhow::anyhow!(e))
}

fn list_sources(config: &Config) {
    println!("Available sources:");
    println!();

    for kind in SourceKind::ALL {
        let marker = if kind == config.source { "*" } else { " " };
        let status = match kind {
            SourceKind::Remote if config.remote.has_api_key() => {
                format!("API key set, {}", config.remote.base_url)
            }
            SourceKind::Remote => "no API key, falls back to offline".to_string(),
            SourceKind::Offline => match &config.offline.dataset_path {
                Some(path) => path.display().to_string(),
                None => "bundled dataset".to_string(),
            },
            SourceKind::Local => match &config.local.table_path {
                Some(path) => path.display().to_string(),
                None => "bundled table".to_string(),
            },
            SourceKind::Synthetic => "always available".to_string(),
        };

        println!("{} {:<10} {}", marker, kind, kind.description());
        println!("  {:<10} [{}]", "", status);
        println!();
    }
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        Config::default().save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'breachrisk config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use breachrisk::model::{BreachRecord, ScanStatus};
    use chrono::Utc;

    fn result(score: u8, breached: bool, status: ScanStatus) -> ScanResult {
        let breaches = if breached {
            vec![BreachRecord::new("Dump", Utc::now())]
        } else {
            Vec::new()
        };
        ScanResult::new(
            "a@example.com",
            "Stub",
            ScoringPolicy::Canonical,
            status,
            score,
            breaches,
        )
    }

    #[test]
    fn test_exit_code_without_fail_on() {
        assert_eq!(
            determine_exit_code(&result(90, true, ScanStatus::Complete), None),
            exit_codes::SUCCESS
        );
    }

    #[test]
    fn test_exit_code_thresholds() {
        let high = result(90, true, ScanStatus::Complete);
        let moderate = result(50, true, ScanStatus::Complete);
        let low = result(20, true, ScanStatus::Complete);

        assert_eq!(
            determine_exit_code(&high, Some(FailLevel::High)),
            exit_codes::HIGH_RISK
        );
        assert_eq!(
            determine_exit_code(&moderate, Some(FailLevel::High)),
            exit_codes::SUCCESS
        );
        assert_eq!(
            determine_exit_code(&moderate, Some(FailLevel::Moderate)),
            exit_codes::MODERATE_RISK
        );
        assert_eq!(
            determine_exit_code(&low, Some(FailLevel::Low)),
            exit_codes::LOW_RISK
        );
    }

    #[test]
    fn test_clean_result_never_fails() {
        assert_eq!(
            determine_exit_code(&result(0, false, ScanStatus::Complete), Some(FailLevel::Low)),
            exit_codes::SUCCESS
        );
    }

    #[test]
    fn test_unavailable_is_distinct() {
        let unavailable = result(
            0,
            false,
            ScanStatus::Unavailable {
                reason: "down".into(),
            },
        );
        assert_eq!(determine_exit_code(&unavailable, None), exit_codes::RISK_UNKNOWN);
    }
}
