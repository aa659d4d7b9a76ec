//! Short-lived file storage.
//!
//! Holds uploaded artifacts on disk under a private spool directory for a
//! bounded retention period. One store instance owns all `StoredFile`
//! entries for its lifetime; callers receive it by reference or `Arc`,
//! never through a global.
//!
//! Key properties:
//! - Validation before admission (size ceiling, MIME allowlist)
//! - Mutation only through the exposed operations, guarded by a mutex
//! - Expired entries removed by an explicit reap or the background reaper

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tempfile::TempDir;
use thiserror::Error;
use uuid::Uuid;

/// Default retention: 24 hours.
const DEFAULT_RETENTION_SECS: i64 = 86_400;

/// Default size ceiling: 50 MB.
const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Reap cadence for the background reaper: hourly.
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(3600);

/// Sleep granularity for shutdown responsiveness (5 seconds).
const SLEEP_GRANULARITY_SECS: u64 = 5;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("file size {size} exceeds maximum allowed size of {max} bytes")]
    FileTooLarge { size: u64, max: u64 },

    #[error("file type {0} is not allowed")]
    TypeNotAllowed(String),

    #[error("no stored file with id {0}")]
    NotFound(Uuid),

    #[error("storage lock poisoned")]
    LockPoisoned,

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Admission policy and retention for one store instance.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub retention_period: chrono::Duration,
    pub max_file_size: u64,
    pub allowed_types: Vec<String>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            retention_period: chrono::Duration::seconds(DEFAULT_RETENTION_SECS),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_types: vec!["application/pdf".to_string()],
        }
    }
}

/// One admitted artifact. `path` points into the store's spool directory
/// and is owned by the store; it disappears on delete, reap, or store drop.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub id: Uuid,
    pub original_name: String,
    pub path: PathBuf,
    pub size: u64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

pub struct TempFileStore {
    files: Mutex<HashMap<Uuid, StoredFile>>,
    options: StoreOptions,
    spool: TempDir,
}

impl TempFileStore {
    pub fn new(options: StoreOptions) -> Result<Self, StorageError> {
        Ok(Self {
            files: Mutex::new(HashMap::new()),
            options,
            spool: TempDir::new()?,
        })
    }

    pub fn with_defaults() -> Result<Self, StorageError> {
        Self::new(StoreOptions::default())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, StoredFile>>, StorageError> {
        self.files.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn validate(&self, size: u64, content_type: &str) -> Result<(), StorageError> {
        if size > self.options.max_file_size {
            return Err(StorageError::FileTooLarge {
                size,
                max: self.options.max_file_size,
            });
        }
        if !self
            .options
            .allowed_types
            .iter()
            .any(|t| t == content_type)
        {
            return Err(StorageError::TypeNotAllowed(content_type.to_string()));
        }
        Ok(())
    }

    /// Admit a file: validate, write the bytes into the spool, register.
    pub fn store_file(
        &self,
        original_name: &str,
        bytes: &[u8],
        content_type: &str,
        metadata: Option<Map<String, Value>>,
    ) -> Result<StoredFile, StorageError> {
        self.validate(bytes.len() as u64, content_type)?;

        let id = Uuid::new_v4();
        let path = self.spool.path().join(id.to_string());
        fs::write(&path, bytes)?;

        let now = Utc::now();
        let stored = StoredFile {
            id,
            original_name: original_name.to_string(),
            path,
            size: bytes.len() as u64,
            content_type: content_type.to_string(),
            uploaded_at: now,
            expires_at: now + self.options.retention_period,
            metadata,
        };

        self.lock()?.insert(id, stored.clone());
        tracing::debug!(%id, name = original_name, size = stored.size, "stored file");
        Ok(stored)
    }

    pub fn get_file(&self, id: Uuid) -> Result<Option<StoredFile>, StorageError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    /// Remove the entry and its backing bytes. Removing an unknown id is a
    /// no-op, matching delete-after-expiry races.
    pub fn delete_file(&self, id: Uuid) -> Result<(), StorageError> {
        let removed = self.lock()?.remove(&id);
        if let Some(file) = removed {
            if let Err(e) = fs::remove_file(&file.path) {
                tracing::warn!(%id, error = %e, "failed to remove spooled file");
            }
        }
        Ok(())
    }

    /// Snapshot of all live entries, in no particular order.
    pub fn stored_files(&self) -> Result<Vec<StoredFile>, StorageError> {
        Ok(self.lock()?.values().cloned().collect())
    }

    /// Shallow-merge `patch` into the entry's metadata. Patch keys win.
    pub fn update_file_metadata(
        &self,
        id: Uuid,
        patch: Map<String, Value>,
    ) -> Result<StoredFile, StorageError> {
        let mut files = self.lock()?;
        let file = files.get_mut(&id).ok_or(StorageError::NotFound(id))?;
        let merged = file.metadata.get_or_insert_with(Map::new);
        for (key, value) in patch {
            merged.insert(key, value);
        }
        Ok(file.clone())
    }

    /// Drop every entry whose retention has elapsed. Returns how many went.
    pub fn reap_expired(&self) -> Result<usize, StorageError> {
        let now = Utc::now();
        let expired: Vec<StoredFile> = {
            let mut files = self.lock()?;
            let ids: Vec<Uuid> = files
                .values()
                .filter(|f| f.expires_at <= now)
                .map(|f| f.id)
                .collect();
            ids.iter().filter_map(|id| files.remove(id)).collect()
        };

        for file in &expired {
            if let Err(e) = fs::remove_file(&file.path) {
                tracing::warn!(id = %file.id, error = %e, "failed to remove expired file");
            }
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "reaped expired files");
        }
        Ok(expired.len())
    }

    pub fn clear_all(&self) -> Result<(), StorageError> {
        let drained: Vec<StoredFile> = self.lock()?.drain().map(|(_, f)| f).collect();
        for file in drained {
            let _ = fs::remove_file(&file.path);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle for the background reaper thread.
///
/// Supports graceful shutdown via `shutdown()` or automatic cleanup on `Drop`.
pub struct ReaperHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl ReaperHandle {
    /// Request graceful shutdown. An in-progress reap completes, but no
    /// further passes are started.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// Start the periodic reaper on a separate thread.
pub fn spawn_reaper(store: Arc<TempFileStore>, interval: Duration) -> ReaperHandle {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();

    let handle = std::thread::spawn(move || {
        tracing::info!(interval_secs = interval.as_secs(), "file reaper started");
        reaper_loop(&store, interval, &flag);
    });

    ReaperHandle {
        shutdown,
        handle: Some(handle),
    }
}

fn reaper_loop(store: &TempFileStore, interval: Duration, shutdown: &AtomicBool) {
    let granularity = Duration::from_secs(SLEEP_GRANULARITY_SECS).min(interval);
    let ticks = (interval.as_secs() / granularity.as_secs().max(1)).max(1);

    while !shutdown.load(Ordering::Relaxed) {
        // Sleep in small increments for responsive shutdown
        for _ in 0..ticks {
            if shutdown.load(Ordering::Relaxed) {
                tracing::info!("file reaper shutting down");
                return;
            }
            std::thread::sleep(granularity);
        }

        if let Err(e) = store.reap_expired() {
            tracing::warn!(error = %e, "reap pass failed");
        }
    }
    tracing::info!("file reaper shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_retention(retention: chrono::Duration) -> TempFileStore {
        TempFileStore::new(StoreOptions {
            retention_period: retention,
            ..StoreOptions::default()
        })
        .unwrap()
    }

    #[test]
    fn store_and_get_round_trip() {
        let store = TempFileStore::with_defaults().unwrap();
        let stored = store
            .store_file("report.pdf", b"%PDF-1.4 test", "application/pdf", None)
            .unwrap();

        let fetched = store.get_file(stored.id).unwrap().unwrap();
        assert_eq!(fetched.original_name, "report.pdf");
        assert_eq!(fetched.size, 13);
        assert!(fetched.path.exists());
        assert!(fetched.expires_at > fetched.uploaded_at);
    }

    #[test]
    fn oversized_file_is_rejected() {
        let store = TempFileStore::new(StoreOptions {
            max_file_size: 4,
            ..StoreOptions::default()
        })
        .unwrap();

        let result = store.store_file("big.pdf", b"too big", "application/pdf", None);
        assert!(matches!(
            result,
            Err(StorageError::FileTooLarge { size: 7, max: 4 })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn disallowed_type_is_rejected() {
        let store = TempFileStore::with_defaults().unwrap();
        let result = store.store_file("evil.exe", b"MZ", "application/octet-stream", None);
        assert!(matches!(result, Err(StorageError::TypeNotAllowed(_))));
    }

    #[test]
    fn delete_removes_entry_and_bytes() {
        let store = TempFileStore::with_defaults().unwrap();
        let stored = store
            .store_file("a.pdf", b"%PDF", "application/pdf", None)
            .unwrap();

        store.delete_file(stored.id).unwrap();
        assert!(store.get_file(stored.id).unwrap().is_none());
        assert!(!stored.path.exists());

        // Deleting again is a no-op
        store.delete_file(stored.id).unwrap();
    }

    #[test]
    fn metadata_patch_is_shallow_merge() {
        let store = TempFileStore::with_defaults().unwrap();
        let mut initial = Map::new();
        initial.insert("pages".into(), Value::from(3));
        initial.insert("status".into(), Value::from("uploaded"));
        let stored = store
            .store_file("a.pdf", b"%PDF", "application/pdf", Some(initial))
            .unwrap();

        let mut patch = Map::new();
        patch.insert("status".into(), Value::from("processed"));
        patch.insert("members".into(), Value::from(12));
        let updated = store.update_file_metadata(stored.id, patch).unwrap();

        let metadata = updated.metadata.unwrap();
        assert_eq!(metadata["pages"], Value::from(3));
        assert_eq!(metadata["status"], Value::from("processed"));
        assert_eq!(metadata["members"], Value::from(12));
    }

    #[test]
    fn metadata_patch_on_unknown_id_is_not_found() {
        let store = TempFileStore::with_defaults().unwrap();
        let result = store.update_file_metadata(Uuid::new_v4(), Map::new());
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn reap_removes_only_expired_entries() {
        let store = store_with_retention(chrono::Duration::seconds(-1));
        let expired = store
            .store_file("old.pdf", b"%PDF", "application/pdf", None)
            .unwrap();

        let fresh_store = store_with_retention(chrono::Duration::hours(24));
        let fresh = fresh_store
            .store_file("new.pdf", b"%PDF", "application/pdf", None)
            .unwrap();

        assert_eq!(store.reap_expired().unwrap(), 1);
        assert!(store.get_file(expired.id).unwrap().is_none());
        assert!(!expired.path.exists());

        assert_eq!(fresh_store.reap_expired().unwrap(), 0);
        assert!(fresh_store.get_file(fresh.id).unwrap().is_some());
    }

    #[test]
    fn clear_all_empties_the_store() {
        let store = TempFileStore::with_defaults().unwrap();
        let a = store
            .store_file("a.pdf", b"%PDF", "application/pdf", None)
            .unwrap();
        store
            .store_file("b.pdf", b"%PDF", "application/pdf", None)
            .unwrap();

        store.clear_all().unwrap();
        assert!(store.is_empty());
        assert!(!a.path.exists());
    }

    #[test]
    fn reaper_thread_shuts_down_cleanly() {
        let store = Arc::new(TempFileStore::with_defaults().unwrap());
        let reaper = spawn_reaper(store, Duration::from_secs(1));
        reaper.shutdown();
        drop(reaper);
    }
}
