//! File-based caching for breach API responses.
//!
//! Entries are JSON files named after a sanitized key and expire after a
//! TTL measured from the file's modification time. The remote source keys
//! entries by a digest of the email, so addresses never appear in file names.
//!
//! # Cache Location
//!
//! - Linux: `~/.cache/breachrisk/`
//! - macOS: `~/Library/Caches/breachrisk/`
//! - Windows: `%LOCALAPPDATA%\breachrisk\`
//!
//! # Example
//!
//! ```no_run
//! use breachrisk::Cache;
//!
//! let cache = Cache::with_ttl_hours(6);
//! cache.set("breaches_abc", &vec!["Adobe".to_string()]).unwrap();
//! let names: Option<Vec<String>> = cache.get("breaches_abc");
//! ```

use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

use crate::error::Result;
use crate::platform::cache_dir;

const CACHE_TTL_HOURS: u64 = 24;

/// A file-based cache with TTL support.
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
    ttl: Duration,
}

impl Cache {
    /// Creates a cache in the platform cache directory with a 24-hour TTL.
    pub fn new() -> Self {
        Self::with_ttl_hours(CACHE_TTL_HOURS)
    }

    pub fn with_ttl_hours(hours: u64) -> Self {
        Self::in_dir(cache_dir(), hours)
    }

    /// Creates a cache rooted at an explicit directory.
    pub fn in_dir(dir: impl AsRef<Path>, ttl_hours: u64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            ttl: Duration::from_secs(ttl_hours.saturating_mul(3600)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }

    fn cache_path(&self, key: &str) -> PathBuf {
        let safe_key: String = key
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", safe_key))
    }

    /// Returns `None` if the key is missing, expired or unreadable.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.cache_path(key);

        if !path.exists() {
            return None;
        }

        if let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) {
            if let Ok(elapsed) = SystemTime::now().duration_since(modified) {
                if elapsed > self.ttl {
                    debug!(key, "cache entry expired");
                    let _ = fs::remove_file(&path);
                    return None;
                }
            }
        }

        let content = fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created or the
    /// file cannot be written.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.ensure_dir()?;
        let path = self.cache_path(key);
        let content = serde_json::to_string(value)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Removes every cached entry and returns how many were deleted.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        if self.dir.exists() {
            for entry in fs::read_dir(&self.dir)?.flatten() {
                let path = entry.path();
                if path.extension().map(|e| e == "json").unwrap_or(false)
                    && fs::remove_file(&path).is_ok()
                {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}
