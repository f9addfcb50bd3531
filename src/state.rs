//! Persistent download progress.
//!
//! The record is serialized to `<target_dir>/.download_progress.json` after
//! every change so an interrupted run loses at most the item in flight.
//! Loading never fails: a missing, malformed or unknown-version file yields
//! a fresh empty record.
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const PROGRESS_FILE_NAME: &str = ".download_progress.json";

/// Current on-disk schema version. Files written before versioning carry no
/// `version` field and load as version 0.
pub const PROGRESS_VERSION: u32 = 1;

/// Which files are known complete, plus the last fully processed surah.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(default)]
    pub version: u32,
    /// File name -> `true`. Presence of a key is what counts.
    #[serde(default)]
    pub completed_files: BTreeMap<String, bool>,
    /// Used for resume messaging only, never for skip decisions.
    #[serde(default)]
    pub last_surah: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    pub fn new() -> Self {
        Self {
            version: PROGRESS_VERSION,
            ..Default::default()
        }
    }

    /// Parses a persisted record, rejecting versions newer than this build.
    fn parse(json: &str) -> Option<Self> {
        let record: ProgressRecord = serde_json::from_str(json).ok()?;
        (record.version <= PROGRESS_VERSION).then_some(record)
    }

    pub fn is_complete(&self, file_name: &str) -> bool {
        self.completed_files.contains_key(file_name)
    }

    pub fn completed_count(&self) -> usize {
        self.completed_files.len()
    }
}

/// A `ProgressRecord` bound to its file. Every mutation is flushed to disk
/// before it returns.
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    record: ProgressRecord,
}

impl ProgressStore {
    pub fn path_in(target_dir: &Path) -> PathBuf {
        target_dir.join(PROGRESS_FILE_NAME)
    }

    /// Loads the record stored in `target_dir`, falling back to an empty one.
    pub async fn load(target_dir: &Path) -> Self {
        let path = Self::path_in(target_dir);

        let record = match tokio::fs::read_to_string(&path).await {
            Ok(json) => match ProgressRecord::parse(&json) {
                Some(record) => record,
                None => {
                    tracing::warn!(
                        path = %path.display(),
                        "Progress file is malformed or from a newer version, starting fresh"
                    );
                    ProgressRecord::new()
                }
            },
            Err(_) => ProgressRecord::new(),
        };

        Self { path, record }
    }

    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_complete(&self, file_name: &str) -> bool {
        self.record.is_complete(file_name)
    }

    pub fn last_surah(&self) -> u16 {
        self.record.last_surah
    }

    /// Writes the record through a temp file and rename, so a crash never
    /// leaves a half-written progress file behind.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or written.
    pub async fn save(&mut self) -> Result<()> {
        self.record.version = PROGRESS_VERSION;
        self.record.updated_at = Some(Utc::now());

        let json = serde_json::to_string_pretty(&self.record)?;
        let temp_path = self.path.with_extension("json.tmp");

        tokio::fs::write(&temp_path, json).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    pub async fn mark_complete(&mut self, file_name: &str) -> Result<()> {
        self.record.completed_files.insert(file_name.to_string(), true);
        self.save().await
    }

    pub async fn mark_incomplete(&mut self, file_name: &str) -> Result<()> {
        self.record.completed_files.remove(file_name);
        self.save().await
    }

    /// Removes several entries with a single write. Returns how many were
    /// actually present.
    pub async fn mark_all_incomplete<'a>(
        &mut self,
        file_names: impl IntoIterator<Item = &'a str>,
    ) -> Result<usize> {
        let removed = file_names
            .into_iter()
            .filter(|name| self.record.completed_files.remove(*name).is_some())
            .count();

        if removed > 0 {
            self.save().await?;
        }
        Ok(removed)
    }

    pub async fn set_last_surah(&mut self, surah: u16) -> Result<()> {
        self.record.last_surah = surah;
        self.save().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_gives_empty_record() {
        let dir = tempdir().unwrap();
        let store = ProgressStore::load(dir.path()).await;

        assert_eq!(store.record().completed_count(), 0);
        assert_eq!(store.last_surah(), 0);
        assert_eq!(store.path(), dir.path().join(".download_progress.json"));
    }

    #[tokio::test]
    async fn test_malformed_file_gives_empty_record() {
        let dir = tempdir().unwrap();
        std::fs::write(ProgressStore::path_in(dir.path()), "{ this is not json").unwrap();

        let store = ProgressStore::load(dir.path()).await;
        assert_eq!(store.record().completed_count(), 0);

        // Wrong value type also counts as malformed
        std::fs::write(
            ProgressStore::path_in(dir.path()),
            r#"{"completed_files": {"001001.mp3": "yes"}, "last_surah": 1}"#,
        )
        .unwrap();
        let store = ProgressStore::load(dir.path()).await;
        assert!(!store.is_complete("001001.mp3"));
    }

    #[tokio::test]
    async fn test_newer_version_is_discarded() {
        let dir = tempdir().unwrap();
        std::fs::write(
            ProgressStore::path_in(dir.path()),
            r#"{"version": 99, "completed_files": {"001001.mp3": true}, "last_surah": 1}"#,
        )
        .unwrap();

        let store = ProgressStore::load(dir.path()).await;
        assert!(!store.is_complete("001001.mp3"));
        assert_eq!(store.last_surah(), 0);
    }

    #[tokio::test]
    async fn test_legacy_file_loads() {
        let dir = tempdir().unwrap();
        std::fs::write(
            ProgressStore::path_in(dir.path()),
            r#"{"completed_files": {"001001.mp3": true, "001002.mp3": true}, "last_surah": 1}"#,
        )
        .unwrap();

        let store = ProgressStore::load(dir.path()).await;
        assert!(store.is_complete("001001.mp3"));
        assert!(store.is_complete("001002.mp3"));
        assert!(!store.is_complete("001003.mp3"));
        assert_eq!(store.last_surah(), 1);
    }

    #[tokio::test]
    async fn test_mutations_are_persisted() -> Result<()> {
        let dir = tempdir()?;
        let mut store = ProgressStore::load(dir.path()).await;

        store.mark_complete("001001.mp3").await?;
        store.mark_complete("001002.mp3").await?;
        store.set_last_surah(1).await?;
        store.mark_incomplete("001002.mp3").await?;

        let reloaded = ProgressStore::load(dir.path()).await;
        assert!(reloaded.is_complete("001001.mp3"));
        assert!(!reloaded.is_complete("001002.mp3"));
        assert_eq!(reloaded.last_surah(), 1);
        assert_eq!(reloaded.record().version, PROGRESS_VERSION);
        assert!(reloaded.record().updated_at.is_some());

        // No temp file left next to the progress file
        assert!(!dir.path().join(".download_progress.json.tmp").exists());

        // Wire format keeps the original field names
        let content = tokio::fs::read_to_string(store.path()).await?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        assert_eq!(value["completed_files"]["001001.mp3"], serde_json::json!(true));
        assert_eq!(value["last_surah"], serde_json::json!(1));

        Ok(())
    }

    #[tokio::test]
    async fn test_mark_all_incomplete_counts_present_entries() -> Result<()> {
        let dir = tempdir()?;
        let mut store = ProgressStore::load(dir.path()).await;
        store.mark_complete("001001.mp3").await?;

        let removed = store
            .mark_all_incomplete(["001001.mp3", "001002.mp3"])
            .await?;
        assert_eq!(removed, 1);
        assert!(!ProgressStore::load(dir.path()).await.is_complete("001001.mp3"));
        Ok(())
    }
}
