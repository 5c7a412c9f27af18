//! Metadata store
//!
//! A single JSON object mapping each kept frame's filename to when it was
//! captured and how it was labeled:
//!
//! ```json
//! {
//!   "auto_20240101_221500_123.jpg": {
//!     "datetime": "2024-01-01T22:15:00.123+01:00",
//!     "classification": "stars"
//!   }
//! }
//! ```
//!
//! The whole document is rewritten on every save, through a temp file in the
//! same directory that is synced and then renamed over the old one, so a
//! crash leaves either the previous or the new document on disk.

use crate::errors::SkywatchError;
use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// What is known about one kept frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    /// Capture time with the local offset, RFC 3339 on disk
    pub datetime: DateTime<FixedOffset>,
    pub classification: String,
    /// Binary predictor verdicts, omitted when no predictors are configured
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub assessments: BTreeMap<String, bool>,
}

impl ClassificationRecord {
    pub fn new(captured_at: DateTime<Local>, classification: impl Into<String>) -> Self {
        Self {
            datetime: captured_at.into(),
            classification: classification.into(),
            assessments: BTreeMap::new(),
        }
    }

    pub fn with_assessments(mut self, assessments: BTreeMap<String, bool>) -> Self {
        self.assessments = assessments;
        self
    }
}

/// Filename → record. Keys are unique; a re-used filename overwrites.
pub type Metadata = BTreeMap<String, ClassificationRecord>;

/// Owns the metadata file on disk
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole document. A missing file is an empty store; an
    /// unparseable one is an error, never silently replaced.
    pub fn load(&self) -> Result<Metadata, SkywatchError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No metadata at {:?}, starting empty", self.path);
                return Ok(Metadata::new());
            }
            Err(e) => {
                return Err(SkywatchError::Metadata(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if contents.trim().is_empty() {
            return Ok(Metadata::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            SkywatchError::Metadata(format!("Failed to parse {}: {}", self.path.display(), e))
        })
    }

    /// Replace the document on disk with `metadata`.
    pub fn save(&self, metadata: &Metadata) -> Result<(), SkywatchError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let json = serde_json::to_string_pretty(metadata)
            .map_err(|e| SkywatchError::Metadata(format!("Failed to serialize: {}", e)))?;

        let mut tmp = NamedTempFile::new_in(&parent)?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| {
            SkywatchError::Metadata(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e.error
            ))
        })?;
        Ok(())
    }

    /// Load, insert or overwrite `filename`, save.
    pub fn insert(
        &self,
        filename: &str,
        record: ClassificationRecord,
    ) -> Result<Metadata, SkywatchError> {
        let mut metadata = self.load()?;
        if metadata.insert(filename.to_string(), record).is_some() {
            log::warn!("Overwriting existing metadata entry for {}", filename);
        }
        self.save(&metadata)?;
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(label: &str) -> ClassificationRecord {
        let at = Local.with_ymd_and_hms(2024, 1, 1, 22, 15, 0).unwrap();
        ClassificationRecord::new(at, label)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path().join("metadata.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_insert_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path().join("metadata.json"));

        store.insert("auto_1.jpg", record("stars")).unwrap();
        store.insert("auto_2.jpg", record("horizon")).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded["auto_1.jpg"].classification, "stars");
        assert_eq!(reloaded["auto_2.jpg"].classification, "horizon");
    }

    #[test]
    fn test_same_filename_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path().join("metadata.json"));
        store.insert("auto_1.jpg", record("horizon")).unwrap();
        let metadata = store.insert("auto_1.jpg", record("stars")).unwrap();
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata["auto_1.jpg"].classification, "stars");
    }

    #[test]
    fn test_on_disk_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path().join("metadata.json"));
        store.insert("auto_1.jpg", record("stars")).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entry = &value["auto_1.jpg"];
        assert_eq!(entry["classification"], "stars");
        assert!(entry["datetime"].as_str().unwrap().starts_with("2024-01-01T22:15:00"));
        assert!(entry.get("assessments").is_none());
    }

    #[test]
    fn test_assessments_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path().join("metadata.json"));
        let mut assessments = BTreeMap::new();
        assessments.insert("stars".to_string(), true);
        let rec = record("stars").with_assessments(assessments);
        store.insert("auto_1.jpg", rec.clone()).unwrap();
        assert_eq!(store.load().unwrap()["auto_1.jpg"], rec);
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        fs::write(&path, "{ not json").unwrap();
        let store = MetadataStore::new(&path);
        assert!(matches!(store.load(), Err(SkywatchError::Metadata(_))));
        assert!(store.insert("auto_1.jpg", record("stars")).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path().join("metadata.json"));
        store.insert("auto_1.jpg", record("stars")).unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
