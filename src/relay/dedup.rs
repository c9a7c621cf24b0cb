//! Processed-transaction tracking.
//!
//! A transaction signature is delivered at most once per tracker lifetime.
//! `MemoryDedupStore` is best-effort: its guarantee resets on restart.
//! `FileDedupStore` snapshots to disk on every mark so the guarantee
//! survives restarts.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashSet;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum DedupError {
    #[error("dedup store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("dedup store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Backing set of processed transaction ids.
pub trait DedupStore: Send + Sync {
    fn contains(&self, id: &str) -> bool;

    /// Record `id`. Returns false if it was already present.
    fn insert(&self, id: &str) -> Result<bool, DedupError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory store. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryDedupStore {
    seen: DashSet<String>,
}

impl MemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DedupStore for MemoryDedupStore {
    fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    fn insert(&self, id: &str) -> Result<bool, DedupError> {
        Ok(self.seen.insert(id.to_string()))
    }

    fn len(&self) -> usize {
        self.seen.len()
    }
}

/// File-backed store: a JSON array of ids rewritten atomically on each insert.
#[derive(Debug)]
pub struct FileDedupStore {
    seen: DashSet<String>,
    path: PathBuf,
    write_lock: std::sync::Mutex<()>,
}

impl FileDedupStore {
    /// Open the store, loading existing ids if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DedupError> {
        let path = path.as_ref().to_path_buf();
        let seen = DashSet::new();

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let ids: Vec<String> = serde_json::from_reader(reader)?;
            for id in ids {
                seen.insert(id);
            }
            tracing::info!(path = %path.display(), entries = seen.len(), "Loaded processed transactions");
        }

        Ok(Self {
            seen,
            path,
            write_lock: std::sync::Mutex::new(()),
        })
    }

    fn save(&self) -> Result<(), DedupError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let ids: BTreeSet<String> = self.seen.iter().map(|r| r.key().clone()).collect();
        let tmp = self.path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut writer, &ids)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl DedupStore for FileDedupStore {
    fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    fn insert(&self, id: &str) -> Result<bool, DedupError> {
        if !self.seen.insert(id.to_string()) {
            return Ok(false);
        }
        if let Err(e) = self.save() {
            // Keep memory and disk consistent: an unsaved id is not processed.
            self.seen.remove(id);
            return Err(e);
        }
        Ok(true)
    }

    fn len(&self) -> usize {
        self.seen.len()
    }
}

/// Idempotency gate in front of the sink.
///
/// Callers hold `lock()` across check → deliver → mark so the sequence is
/// a critical section even with several workers.
#[derive(Clone)]
pub struct DedupTracker {
    store: Arc<dyn DedupStore>,
    gate: Arc<Mutex<()>>,
}

impl DedupTracker {
    pub fn new(store: Arc<dyn DedupStore>) -> Self {
        Self {
            store,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Best-effort in-memory tracker.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryDedupStore::new()))
    }

    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    pub fn should_process(&self, id: &str) -> bool {
        !self.store.contains(id)
    }

    pub fn mark_processed(&self, id: &str) -> Result<(), DedupError> {
        if self.store.insert(id)? {
            metrics::record_dedup_entries(self.store.len());
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl std::fmt::Debug for DedupTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupTracker")
            .field("entries", &self.store.len())
            .finish()
    }
}
