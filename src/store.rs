//! Record store for dataset and uploaded-file records
//!
//! A small create/read registry persisted as JSON next to the upload
//! directory. Ingestion never writes back here; the store only answers
//! "which sources exist" and hands out ids for uploads.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Kind of ingestion source a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Dataset,
    File,
}

/// One registered ingestion source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: u64,
    pub kind: RecordKind,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Registry of ingestion sources, persisted to disk
pub struct RecordStore {
    records: DashMap<u64, SourceRecord>,
    path: PathBuf,
    next_id: AtomicU64,
}

impl RecordStore {
    /// Open the store at `path`, loading any persisted records. A missing
    /// or unreadable file starts the store empty.
    pub fn open(path: PathBuf) -> Self {
        let records = Self::load(&path);
        let next_id = records
            .iter()
            .map(|e| e.value().id + 1)
            .max()
            .unwrap_or(0);
        tracing::info!("Loaded {} source records from registry", records.len());

        Self {
            records,
            path,
            next_id: AtomicU64::new(next_id),
        }
    }

    fn load(path: &PathBuf) -> DashMap<u64, SourceRecord> {
        let records = DashMap::new();

        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str::<Vec<SourceRecord>>(&content) {
                    Ok(stored) => {
                        for record in stored {
                            records.insert(record.id, record);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse records file: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read records file: {}", e);
                }
            }
        }

        records
    }

    fn save(&self) {
        let mut stored: Vec<SourceRecord> =
            self.records.iter().map(|e| e.value().clone()).collect();
        stored.sort_by_key(|r| r.id);

        match serde_json::to_string_pretty(&stored) {
            Ok(content) => {
                // Write-then-rename keeps the registry intact if the
                // process dies mid-save
                let tmp = self.path.with_extension("json.tmp");
                let result = std::fs::write(&tmp, content)
                    .and_then(|_| std::fs::rename(&tmp, &self.path));
                if let Err(e) = result {
                    tracing::error!("Failed to save records file: {}", e);
                }
            }
            Err(e) => {
                tracing::error!("Failed to serialize records: {}", e);
            }
        }
    }

    /// Register a new source, returning the record with its assigned id
    pub fn create(&self, kind: RecordKind, name: &str) -> SourceRecord {
        let record = SourceRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            kind,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.records.insert(record.id, record.clone());
        self.save();
        record
    }

    pub fn get(&self, id: u64) -> Option<SourceRecord> {
        self.records.get(&id).map(|r| r.clone())
    }

    /// Dataset record by name, if one was registered
    pub fn dataset_by_name(&self, name: &str) -> Option<SourceRecord> {
        self.records
            .iter()
            .find(|e| e.value().kind == RecordKind::Dataset && e.value().name == name)
            .map(|e| e.value().clone())
    }

    /// All dataset records, oldest first
    pub fn list_datasets(&self) -> Vec<SourceRecord> {
        let mut datasets: Vec<SourceRecord> = self
            .records
            .iter()
            .filter(|e| e.value().kind == RecordKind::Dataset)
            .map(|e| e.value().clone())
            .collect();
        datasets.sort_by_key(|r| r.id);
        datasets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_assigns_sequential_ids() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path().join("records.json"));

        let first = store.create(RecordKind::Dataset, "aisuko/squad01");
        let second = store.create(RecordKind::File, "notes.csv");
        assert_eq!(first.id, 0);
        assert_eq!(second.id, 1);
        assert_eq!(store.get(1).unwrap().name, "notes.csv");
    }

    #[test]
    fn test_reopen_restores_records_and_id_cursor() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");

        {
            let store = RecordStore::open(path.clone());
            store.create(RecordKind::Dataset, "aisuko/squad01");
            store.create(RecordKind::Dataset, "aisuko/squad02");
        }

        let reopened = RecordStore::open(path);
        assert_eq!(reopened.list_datasets().len(), 2);
        let next = reopened.create(RecordKind::File, "upload.csv");
        assert_eq!(next.id, 2);
    }

    #[test]
    fn test_dataset_lookup_ignores_file_records() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path().join("records.json"));
        store.create(RecordKind::File, "shared-name");

        assert!(store.dataset_by_name("shared-name").is_none());
        store.create(RecordKind::Dataset, "shared-name");
        assert!(store.dataset_by_name("shared-name").is_some());
    }

    #[test]
    fn test_save_replaces_file_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");

        let store = RecordStore::open(path.clone());
        store.create(RecordKind::Dataset, "aisuko/squad01");
        store.create(RecordKind::File, "upload.csv");

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = RecordStore::open(path);
        assert_eq!(reopened.get(1).unwrap().name, "upload.csv");
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path().join("absent.json"));
        assert!(store.list_datasets().is_empty());
    }
}
