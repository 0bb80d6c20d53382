//! Reading-progress persistence.
//!
//! The playback controller calls [`ProgressSink::save`] with the durable pair
//! `(chunk index, settings)` on every transition that changes it. Saving is
//! fire-and-forget: a sink logs its own failures and never reports them back
//! into playback.
//!
//! [`JsonProgressStore`] keeps one record per document in a JSON file and
//! hands out per-document sinks.

pub mod store;

pub use store::{DocumentProgress, JsonProgressStore, PersistError, ProgressRecord};

use crate::config::ReaderSettings;

// ---------------------------------------------------------------------------
// ProgressSink
// ---------------------------------------------------------------------------

/// Receives durable playback snapshots.
pub trait ProgressSink: Send + Sync + std::fmt::Debug {
    fn save(&self, chunk_index: usize, settings: &ReaderSettings);
}

/// Discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn save(&self, _chunk_index: usize, _settings: &ReaderSettings) {}
}

// ---------------------------------------------------------------------------
// RecordingSink  (test-only)
// ---------------------------------------------------------------------------

/// Test double that keeps every snapshot in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    saves: std::sync::Mutex<Vec<(usize, ReaderSettings)>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saves(&self) -> Vec<(usize, ReaderSettings)> {
        self.saves.lock().unwrap().clone()
    }

    pub fn indices(&self) -> Vec<usize> {
        self.saves().into_iter().map(|(i, _)| i).collect()
    }

    pub fn clear(&self) {
        self.saves.lock().unwrap().clear();
    }
}

#[cfg(test)]
impl ProgressSink for RecordingSink {
    fn save(&self, chunk_index: usize, settings: &ReaderSettings) {
        self.saves
            .lock()
            .unwrap()
            .push((chunk_index, settings.clone()));
    }
}
