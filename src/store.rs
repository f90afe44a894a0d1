//! Persistence for scans and user profiles.
//!
//! Two collaborators sit behind traits so the scan service can run with
//! any backing store, or none:
//!
//! | Trait | Owns |
//! |-------|------|
//! | [`ProfileStore`] | [`UserProfile`]s and their latest risk snapshot |
//! | [`ScanStore`] | [`ScanResult`]s, assigning ids on save |
//!
//! [`MemoryStore`] keeps everything in process. [`JsonFileStore`] writes one
//! JSON file per record and is what the CLI uses.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{normalize_email, ScanResult, UserProfile};
use crate::platform;

const ID_LEN: usize = 16;

pub trait ProfileStore: Send + Sync {
    /// Returns the profile for `email`, creating it if needed.
    ///
    /// The email is normalized first. An existing profile is returned
    /// unchanged, whatever `full_name` is passed.
    fn find_or_create(&self, email: &str, full_name: Option<&str>) -> Result<UserProfile>;

    fn get_profile(&self, id: &str) -> Result<UserProfile>;

    /// Records the latest risk score on a profile.
    ///
    /// # Errors
    ///
    /// [`Error::ScoreOutOfRange`] outside 0..=100, [`Error::NotFound`] for an
    /// unknown id.
    fn update_risk_score(&self, id: &str, score: i64) -> Result<UserProfile>;

    fn list_profiles(&self) -> Result<Vec<UserProfile>>;
}

pub trait ScanStore: Send + Sync {
    /// Persists a scan and returns it with its assigned id.
    fn save_scan(&self, scan: ScanResult) -> Result<ScanResult>;

    fn get_scan(&self, id: &str) -> Result<ScanResult>;

    /// Scans for one email, newest first.
    fn list_scans(&self, email: &str) -> Result<Vec<ScanResult>>;
}

fn short_hash(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
        hasher.update([0u8]);
    }
    let mut id = hex::encode(hasher.finalize());
    id.truncate(ID_LEN);
    id
}

/// Stable profile id for an email.
pub fn profile_id(email: &str) -> String {
    short_hash(&[normalize_email(email).as_bytes()])
}

fn scan_id(scan: &ScanResult, counter: u64) -> String {
    short_hash(&[
        scan.email.as_bytes(),
        scan.scan_date.to_rfc3339().as_bytes(),
        &counter.to_be_bytes(),
    ])
}

fn new_profile(email: &str, full_name: Option<&str>) -> UserProfile {
    let email = normalize_email(email);
    UserProfile {
        id: profile_id(&email),
        full_name: full_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string),
        email,
        created_at: Utc::now(),
        risk_score: None,
    }
}

fn check_score(score: i64) -> Result<u8> {
    u8::try_from(score)
        .ok()
        .filter(|s| *s <= 100)
        .ok_or(Error::ScoreOutOfRange(score))
}

fn newest_first(scans: &mut [ScanResult]) {
    scans.sort_by(|a, b| b.scan_date.cmp(&a.scan_date));
}

/// In-process store backed by hash maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
    scans: RwLock<HashMap<String, ScanResult>>,
    counter: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryStore {
    fn find_or_create(&self, email: &str, full_name: Option<&str>) -> Result<UserProfile> {
        let profile = new_profile(email, full_name);
        let mut profiles = self.profiles.write().unwrap_or_else(PoisonError::into_inner);
        Ok(profiles
            .entry(profile.id.clone())
            .or_insert(profile)
            .clone())
    }

    fn get_profile(&self, id: &str) -> Result<UserProfile> {
        let profiles = self.profiles.read().unwrap_or_else(PoisonError::into_inner);
        profiles
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("profile", id))
    }

    fn update_risk_score(&self, id: &str, score: i64) -> Result<UserProfile> {
        let score = check_score(score)?;
        let mut profiles = self.profiles.write().unwrap_or_else(PoisonError::into_inner);
        let profile = profiles
            .get_mut(id)
            .ok_or_else(|| Error::not_found("profile", id))?;
        profile.risk_score = Some(score);
        Ok(profile.clone())
    }

    fn list_profiles(&self) -> Result<Vec<UserProfile>> {
        let profiles = self.profiles.read().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<_> = profiles.values().cloned().collect();
        list.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(list)
    }
}

impl ScanStore for MemoryStore {
    fn save_scan(&self, scan: ScanResult) -> Result<ScanResult> {
        let mut scans = self.scans.write().unwrap_or_else(PoisonError::into_inner);
        let id = loop {
            let id = scan_id(&scan, self.counter.fetch_add(1, Ordering::Relaxed));
            if !scans.contains_key(&id) {
                break id;
            }
        };
        let scan = scan.with_id(id.clone());
        scans.insert(id, scan.clone());
        Ok(scan)
    }

    fn get_scan(&self, id: &str) -> Result<ScanResult> {
        let scans = self.scans.read().unwrap_or_else(PoisonError::into_inner);
        scans
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("scan", id))
    }

    fn list_scans(&self, email: &str) -> Result<Vec<ScanResult>> {
        let email = normalize_email(email);
        let scans = self.scans.read().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<_> = scans.values().filter(|s| s.email == email).cloned().collect();
        newest_first(&mut list);
        Ok(list)
    }
}

/// File-backed store: `<dir>/profiles/<id>.json` and `<dir>/scans/<id>.json`.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    counter: AtomicU64,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            counter: AtomicU64::new(0),
        }
    }

    /// Store under the platform data directory.
    pub fn default_location() -> Self {
        Self::new(platform::data_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn profiles_dir(&self) -> PathBuf {
        self.dir.join("profiles")
    }

    fn scans_dir(&self) -> PathBuf {
        self.dir.join("scans")
    }

    /// Ids are hex, so anything else can't name a stored record.
    fn record_path(dir: PathBuf, id: &str) -> Option<PathBuf> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(dir.join(format!("{}.json", id)))
    }

    /// Writes beside `path` and renames into place, so a record on disk is
    /// either the old version or the complete new one.
    fn write<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let mut file = NamedTempFile::new_in(parent)?;
        file.write_all(serde_json::to_string_pretty(value)?.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn read<T: serde::de::DeserializeOwned>(
        dir: PathBuf,
        kind: &'static str,
        id: &str,
    ) -> Result<T> {
        let path = Self::record_path(dir, id)
            .filter(|p| p.exists())
            .ok_or_else(|| Error::not_found(kind, id))?;
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn read_all<T: serde::de::DeserializeOwned>(dir: PathBuf) -> Result<Vec<T>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&dir)?.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            match fs::read_to_string(&path)
                .map_err(Error::from)
                .and_then(|c| serde_json::from_str(&c).map_err(Error::from))
            {
                Ok(record) => records.push(record),
                Err(e) => debug!(path = %path.display(), error = %e, "skipping unreadable record"),
            }
        }
        Ok(records)
    }
}

impl ProfileStore for JsonFileStore {
    fn find_or_create(&self, email: &str, full_name: Option<&str>) -> Result<UserProfile> {
        let profile = new_profile(email, full_name);
        match self.get_profile(&profile.id) {
            Ok(existing) => Ok(existing),
            Err(e) if e.is_not_found() => {
                if let Some(path) = Self::record_path(self.profiles_dir(), &profile.id) {
                    Self::write(&path, &profile)?;
                }
                Ok(profile)
            }
            Err(e) => Err(e),
        }
    }

    fn get_profile(&self, id: &str) -> Result<UserProfile> {
        Self::read(self.profiles_dir(), "profile", id)
    }

    fn update_risk_score(&self, id: &str, score: i64) -> Result<UserProfile> {
        let score = check_score(score)?;
        let mut profile = self.get_profile(id)?;
        profile.risk_score = Some(score);
        if let Some(path) = Self::record_path(self.profiles_dir(), id) {
            Self::write(&path, &profile)?;
        }
        Ok(profile)
    }

    fn list_profiles(&self) -> Result<Vec<UserProfile>> {
        let mut list: Vec<UserProfile> = Self::read_all(self.profiles_dir())?;
        list.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(list)
    }
}

impl ScanStore for JsonFileStore {
    fn save_scan(&self, scan: ScanResult) -> Result<ScanResult> {
        let (id, path) = loop {
            let id = scan_id(&scan, self.counter.fetch_add(1, Ordering::Relaxed));
            if let Some(path) = Self::record_path(self.scans_dir(), &id) {
                if !path.exists() {
                    break (id, path);
                }
            }
        };
        let scan = scan.with_id(id);
        Self::write(&path, &scan)?;
        Ok(scan)
    }

    fn get_scan(&self, id: &str) -> Result<ScanResult> {
        Self::read(self.scans_dir(), "scan", id)
    }

    fn list_scans(&self, email: &str) -> Result<Vec<ScanResult>> {
        let email = normalize_email(email);
        let mut list: Vec<ScanResult> = Self::read_all(self.scans_dir())?;
        list.retain(|s| s.email == email);
        newest_first(&mut list);
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScanStatus;
    use crate::risk::ScoringPolicy;

    fn scan(email: &str, score: u8) -> ScanResult {
        ScanResult::new(
            email,
            "Offline Breach Database",
            ScoringPolicy::Canonical,
            ScanStatus::Complete,
            score,
            Vec::new(),
        )
    }

    fn exercise_profiles(store: &dyn ProfileStore) {
        let created = store
            .find_or_create(" Jane@Example.com ", Some("Jane Doe"))
            .unwrap();
        assert_eq!(created.email, "jane@example.com");
        assert_eq!(created.id.len(), ID_LEN);
        assert_eq!(created.full_name.as_deref(), Some("Jane Doe"));
        assert!(created.risk_score.is_none());

        let again = store.find_or_create("jane@example.com", Some("Other")).unwrap();
        assert_eq!(again, created);

        let updated = store.update_risk_score(&created.id, 42).unwrap();
        assert_eq!(updated.risk_score, Some(42));
        assert_eq!(store.get_profile(&created.id).unwrap().risk_score, Some(42));

        assert!(matches!(
            store.update_risk_score(&created.id, 101),
            Err(Error::ScoreOutOfRange(101))
        ));
        assert!(matches!(
            store.update_risk_score(&created.id, -1),
            Err(Error::ScoreOutOfRange(-1))
        ));
        assert!(store.update_risk_score("deadbeef", 10).unwrap_err().is_not_found());
        assert!(store.get_profile("deadbeef").unwrap_err().is_not_found());

        store.find_or_create("adam@example.com", None).unwrap();
        let emails: Vec<_> = store
            .list_profiles()
            .unwrap()
            .into_iter()
            .map(|p| p.email)
            .collect();
        assert_eq!(emails, vec!["adam@example.com", "jane@example.com"]);
    }

    fn exercise_scans(store: &dyn ScanStore) {
        let first = store.save_scan(scan("a@example.com", 10)).unwrap();
        let second = store.save_scan(scan("a@example.com", 20)).unwrap();
        store.save_scan(scan("b@example.com", 30)).unwrap();

        let id = first.id.clone().unwrap();
        assert_eq!(id.len(), ID_LEN);
        assert_ne!(first.id, second.id);
        assert_eq!(store.get_scan(&id).unwrap().risk_score, 10);
        assert!(store.get_scan("0000000000000000").unwrap_err().is_not_found());

        let scans = store.list_scans("A@example.com").unwrap();
        assert_eq!(scans.len(), 2);
        assert!(scans[0].scan_date >= scans[1].scan_date);
        assert!(store.list_scans("nobody@example.com").unwrap().is_empty());
    }

    #[test]
    fn test_memory_profiles() {
        exercise_profiles(&MemoryStore::new());
    }

    #[test]
    fn test_memory_scans() {
        exercise_scans(&MemoryStore::new());
    }

    #[test]
    fn test_file_profiles() {
        let dir = tempfile::tempdir().unwrap();
        exercise_profiles(&JsonFileStore::new(dir.path()));
    }

    #[test]
    fn test_file_scans() {
        let dir = tempfile::tempdir().unwrap();
        exercise_scans(&JsonFileStore::new(dir.path()));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let saved = JsonFileStore::new(dir.path())
            .save_scan(scan("a@example.com", 55))
            .unwrap();

        let reopened = JsonFileStore::new(dir.path());
        let loaded = reopened.get_scan(saved.id.as_deref().unwrap()).unwrap();
        assert_eq!(loaded.risk_score, 55);
        assert_eq!(loaded.id, saved.id);
    }

    #[test]
    fn test_file_store_rewrite_leaves_only_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let profile = store.find_or_create("a@example.com", None).unwrap();
        store.update_risk_score(&profile.id, 40).unwrap();
        store.update_risk_score(&profile.id, 75).unwrap();

        let names: Vec<String> = fs::read_dir(store.profiles_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![format!("{}.json", profile.id)]);
        assert_eq!(store.get_profile(&profile.id).unwrap().risk_score, Some(75));
    }

    #[test]
    fn test_file_store_ignores_interrupted_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let saved = store.save_scan(scan("a@example.com", 55)).unwrap();
        fs::write(store.scans_dir().join(".tmpAbC123"), "{\"email\": \"a@exa").unwrap();

        let scans = store.list_scans("a@example.com").unwrap();
        assert_eq!(scans.len(), 1);
        assert_eq!(scans[0].id, saved.id);
    }

    #[test]
    fn test_file_store_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.get_scan("../../etc/passwd").unwrap_err().is_not_found());
        assert!(store.get_profile("").unwrap_err().is_not_found());
    }

    #[test]
    fn test_profile_id_ignores_case_and_padding() {
        assert_eq!(profile_id("A@Example.com "), profile_id("a@example.com"));
        assert_ne!(profile_id("a@example.com"), profile_id("b@example.com"));
    }
}
