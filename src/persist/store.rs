//! JSON file of per-document reading progress.
//!
//! ```text
//! {
//!   "/home/me/books/moby-dick.txt": {
//!     "chunk_index": 412,
//!     "settings": { "playback_rate": 1.25, "volume": 80, ... }
//!   }
//! }
//! ```
//!
//! The whole map is rewritten on every save through a temporary file and a
//! rename, so a crash mid-write leaves the previous file intact. Saves made
//! from inside a tokio runtime do the file I/O on the blocking pool; writes
//! are serialised and each one flushes the latest map, so the last write to
//! land always holds the newest records.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ReaderSettings;

use super::ProgressSink;

// ---------------------------------------------------------------------------
// PersistError
// ---------------------------------------------------------------------------

/// Errors from reading or writing the progress file.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("progress store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("progress store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// ProgressRecord
// ---------------------------------------------------------------------------

/// Saved position and settings for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub chunk_index: usize,
    pub settings: ReaderSettings,
}

// ---------------------------------------------------------------------------
// JsonProgressStore
// ---------------------------------------------------------------------------

/// Progress records keyed by document, backed by one JSON file.
#[derive(Debug)]
pub struct JsonProgressStore {
    path: PathBuf,
    records: Mutex<BTreeMap<String, ProgressRecord>>,
    write: Mutex<()>,
}

impl JsonProgressStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let path = path.into();
        let records = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            records: Mutex::new(records),
            write: Mutex::new(()),
        })
    }

    /// Open the store, starting empty when the file is unreadable.
    ///
    /// The damaged file is left alone until the next save overwrites it.
    pub fn open_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::open(&path) {
            Ok(store) => store,
            Err(e) => {
                log::warn!("persist: ignoring unreadable {} ({e})", path.display());
                Self {
                    path,
                    records: Mutex::new(BTreeMap::new()),
                    write: Mutex::new(()),
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved record for `key`, if any.
    pub fn load(&self, key: &str) -> Option<ProgressRecord> {
        self.lock().get(key).cloned()
    }

    /// Store `record` under `key` and rewrite the file.
    pub fn record(&self, key: &str, record: ProgressRecord) -> Result<(), PersistError> {
        if self.update(key, record) {
            self.flush()?;
        }
        Ok(())
    }

    /// Store `record` in memory only. Returns whether anything changed.
    pub fn update(&self, key: &str, record: ProgressRecord) -> bool {
        let mut records = self.lock();
        if records.get(key) == Some(&record) {
            return false;
        }
        records.insert(key.to_string(), record);
        true
    }

    /// Rewrite the file from the current in-memory records.
    pub fn flush(&self) -> Result<(), PersistError> {
        let _write = self.write.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = serde_json::to_string_pretty(&*self.lock())?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, snapshot)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// A [`ProgressSink`] that saves under `key`.
    pub fn sink(self: &Arc<Self>, key: impl Into<String>) -> DocumentProgress {
        DocumentProgress {
            store: Arc::clone(self),
            key: key.into(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, ProgressRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// DocumentProgress
// ---------------------------------------------------------------------------

/// Per-document sink handed to the playback controller.
#[derive(Debug, Clone)]
pub struct DocumentProgress {
    store: Arc<JsonProgressStore>,
    key: String,
}

impl DocumentProgress {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl ProgressSink for DocumentProgress {
    fn save(&self, chunk_index: usize, settings: &ReaderSettings) {
        let record = ProgressRecord {
            chunk_index,
            settings: settings.clone(),
        };
        if !self.store.update(&self.key, record) {
            return;
        }

        let store = Arc::clone(&self.store);
        let key = self.key.clone();
        let flush = move || match store.flush() {
            Ok(()) => log::debug!("persist: {key} → chunk {chunk_index}"),
            Err(e) => log::warn!("persist: failed to save progress for {key}: {e}"),
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(flush);
            }
            Err(_) => flush(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
