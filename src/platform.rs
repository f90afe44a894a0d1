//! Platform-specific directories.
//!
//! Each function resolves through `dirs` and falls back to a relative or
//! temporary location when the platform directory cannot be determined.

use std::path::PathBuf;

const APP_DIR: &str = "breachrisk";

/// Directory holding `config.toml`.
///
/// - Linux: `~/.config/breachrisk/`
/// - macOS: `~/Library/Application Support/breachrisk/`
/// - Windows: `%APPDATA%\breachrisk\`
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Directory for cached API responses.
///
/// - Linux: `~/.cache/breachrisk/`
/// - macOS: `~/Library/Caches/breachrisk/`
/// - Windows: `%LOCALAPPDATA%\breachrisk\`
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

/// Directory for persisted scans and profiles.
///
/// - Linux: `~/.local/share/breachrisk/`
/// - macOS: `~/Library/Application Support/breachrisk/`
/// - Windows: `%APPDATA%\breachrisk\`
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
