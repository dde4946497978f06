//! Durable pagination checkpoints.
//!
//! One checkpoint file per (database, collection) pair records every
//! document accumulated so far, the next page offset, and the extraction
//! log. Files are written via temp-file + rename so a crash mid-write never
//! leaves a half-serialized checkpoint, and a sibling `.lock` file holds an
//! advisory lock while an extraction is running so two processes cannot
//! resume the same resource at once.
//!
//! Directory layout:
//!
//! ```text
//! <checkpoint_dir>/
//! ├─ maindb--orders.checkpoint.json
//! ├─ maindb--orders.lock
//! └─ maindb--users.checkpoint.json
//! ```

use crate::error::{Result, StageSyncError};
use crate::models::DocumentRecord;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Current checkpoint file format version.
///
/// Older files stay loadable through serde defaults on later-added fields;
/// files written by a newer version are rejected rather than misread.
pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

/// Durable extraction progress for one (database, collection) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub format_version: u32,
    pub database_id: String,
    pub collection_id: String,
    pub documents: Vec<DocumentRecord>,
    /// Offset the next page fetch starts at; never decreases across
    /// persists of the same resource.
    pub next_offset: u64,
    pub log: Vec<String>,
    /// Set exactly once, on the page fetch that comes back empty.
    pub completed: bool,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Checkpoint {
    /// Fresh checkpoint at offset zero.
    pub fn new(database_id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            format_version: CHECKPOINT_FORMAT_VERSION,
            database_id: database_id.into(),
            collection_id: collection_id.into(),
            documents: Vec::new(),
            next_offset: 0,
            log: Vec::new(),
            completed: false,
            updated_at: chrono::Utc::now(),
        }
    }

    /// Absorbs one fetched page: appends its documents and advances the
    /// offset by the page size.
    pub fn record_page(&mut self, documents: Vec<DocumentRecord>, page_size: u64) {
        self.documents.extend(documents);
        self.next_offset += page_size;
        self.updated_at = chrono::Utc::now();
    }

    /// Marks extraction finished; the offset stays where the empty page was
    /// requested.
    pub fn mark_completed(&mut self) {
        self.completed = true;
        self.updated_at = chrono::Utc::now();
    }
}

/// File-backed checkpoint storage.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

/// Advisory lock on one (database, collection) extraction, released on drop.
#[derive(Debug)]
pub struct ExtractionLock {
    _file: File,
}

impl CheckpointStore {
    /// Opens the store, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            StageSyncError::checkpoint_failed(
                format!("create checkpoint directory {}", dir.display()),
                e,
            )
        })?;
        Ok(Self { dir })
    }

    /// Deterministic file stem for a (database, collection) pair.
    fn stem(database_id: &str, collection_id: &str) -> String {
        format!("{}--{}", sanitize(database_id), sanitize(collection_id))
    }

    fn checkpoint_path(&self, database_id: &str, collection_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.checkpoint.json", Self::stem(database_id, collection_id)))
    }

    fn lock_path(&self, database_id: &str, collection_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.lock", Self::stem(database_id, collection_id)))
    }

    /// Loads the checkpoint for a resource, or `None` if none was persisted.
    pub fn load(&self, database_id: &str, collection_id: &str) -> Result<Option<Checkpoint>> {
        let path = self.checkpoint_path(database_id, collection_id);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StageSyncError::checkpoint_failed(
                    format!("read checkpoint {}", path.display()),
                    e,
                ));
            }
        };

        let checkpoint: Checkpoint = serde_json::from_str(&data).map_err(|e| {
            StageSyncError::serialization_failed(format!("parse checkpoint {}", path.display()), e)
        })?;

        if checkpoint.format_version > CHECKPOINT_FORMAT_VERSION {
            return Err(StageSyncError::CheckpointVersion {
                found: checkpoint.format_version,
                supported: CHECKPOINT_FORMAT_VERSION,
            });
        }

        Ok(Some(checkpoint))
    }

    /// Persists a checkpoint atomically (write to temp file, then rename).
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let path = self.checkpoint_path(&checkpoint.database_id, &checkpoint.collection_id);
        let tmp_path = path.with_extension("json.tmp");

        let data = serde_json::to_string_pretty(checkpoint).map_err(|e| {
            StageSyncError::serialization_failed("encode checkpoint".to_string(), e)
        })?;

        fs::write(&tmp_path, data).map_err(|e| {
            StageSyncError::checkpoint_failed(
                format!("write checkpoint temp file {}", tmp_path.display()),
                e,
            )
        })?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            StageSyncError::checkpoint_failed(
                format!("commit checkpoint {}", path.display()),
                e,
            )
        })?;

        Ok(())
    }

    /// Takes the exclusive extraction lock for a resource.
    ///
    /// # Errors
    /// Returns [`StageSyncError::CheckpointLocked`] if another extraction,
    /// in this process or any other, currently holds the lock.
    pub fn lock(&self, database_id: &str, collection_id: &str) -> Result<ExtractionLock> {
        let path = self.lock_path(database_id, collection_id);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                StageSyncError::checkpoint_failed(
                    format!("open lock file {}", path.display()),
                    e,
                )
            })?;

        if file.try_lock_exclusive().is_err() {
            return Err(StageSyncError::CheckpointLocked {
                key: Self::stem(database_id, collection_id),
            });
        }

        Ok(ExtractionLock { _file: file })
    }

    /// Directory this store persists into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Keeps ids filesystem-safe while staying readable.
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_document(id: &str) -> DocumentRecord {
        let raw = json!({ "$id": id, "name": "sample" });
        DocumentRecord::from_raw(raw.as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open(dir.path()).unwrap();

        let mut checkpoint = Checkpoint::new("maindb", "orders");
        checkpoint.record_page(vec![sample_document("doc-1")], 100);
        checkpoint.log.push("fetched page at offset 0".to_string());
        store.save(&checkpoint).unwrap();

        let loaded = store.load("maindb", "orders").unwrap().unwrap();
        assert_eq!(loaded.next_offset, 100);
        assert_eq!(loaded.documents.len(), 1);
        assert_eq!(loaded.log.len(), 1);
        assert!(!loaded.completed);
    }

    #[test]
    fn test_load_missing_checkpoint_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open(dir.path()).unwrap();
        assert!(store.load("maindb", "nothing").unwrap().is_none());
    }

    #[test]
    fn test_no_temp_file_left_behind_after_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open(dir.path()).unwrap();
        store.save(&Checkpoint::new("maindb", "orders")).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_offset_advances_by_page_size() {
        let mut checkpoint = Checkpoint::new("maindb", "orders");
        checkpoint.record_page(vec![sample_document("a")], 100);
        assert_eq!(checkpoint.next_offset, 100);
        checkpoint.record_page(vec![sample_document("b")], 100);
        assert_eq!(checkpoint.next_offset, 200);

        // Completion leaves the offset where the empty page was requested.
        checkpoint.mark_completed();
        assert_eq!(checkpoint.next_offset, 200);
        assert!(checkpoint.completed);
    }

    #[test]
    fn test_lock_is_exclusive_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open(dir.path()).unwrap();

        let guard = store.lock("maindb", "orders").unwrap();
        let contended = store.lock("maindb", "orders");
        assert!(matches!(
            contended,
            Err(StageSyncError::CheckpointLocked { .. })
        ));

        // A different resource is not affected.
        store.lock("maindb", "users").unwrap();

        drop(guard);
        store.lock("maindb", "orders").unwrap();
    }

    #[test]
    fn test_newer_format_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open(dir.path()).unwrap();

        let mut checkpoint = Checkpoint::new("maindb", "orders");
        checkpoint.format_version = CHECKPOINT_FORMAT_VERSION + 1;
        store.save(&checkpoint).unwrap();

        assert!(matches!(
            store.load("maindb", "orders"),
            Err(StageSyncError::CheckpointVersion { .. })
        ));
    }

    #[test]
    fn test_ids_are_sanitized_for_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open(dir.path()).unwrap();

        let checkpoint = Checkpoint::new("main/db", "orders:v2");
        store.save(&checkpoint).unwrap();
        assert!(store.load("main/db", "orders:v2").unwrap().is_some());
    }
}
