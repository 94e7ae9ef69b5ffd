//! Durable correlation store.
//!
//! The bridge's memory of "which email thread belongs to which issue":
//! a write-once map from outbound message identifier to issue number,
//! persisted as a versioned bincode snapshot. Every successful `put` is
//! flushed to disk before returning, and the snapshot is written to a
//! temp file and renamed into place, so a crash can lose at most the one
//! in-flight correlation and never corrupts recorded entries.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors raised by the correlation store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key is already recorded. Duplicate writes happen when the
    /// upstream webhook redelivers an event; callers treat this as
    /// "already done", not as a failure.
    #[error("correlation key already recorded: {0}")]
    DuplicateKey(String),
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("store version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u32, actual: u32 },
}

/// On-disk snapshot format.
#[derive(Serialize, Deserialize)]
struct StoredCorrelations {
    version: u32,
    entries: HashMap<String, i64>,
}

/// Persistent mapping from outbound message identifier to issue number.
///
/// Entries are write-once and never deleted; history is deliberately
/// unbounded for a low-volume bridge.
#[derive(Debug)]
pub struct CorrelationStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, i64>>,
}

impl CorrelationStore {
    /// Current snapshot version.
    const STORE_VERSION: u32 = 1;

    /// Open a store, loading the snapshot at `path` if one exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let entries = if path.exists() {
            let data = std::fs::read(path)?;
            let stored: StoredCorrelations = bincode::deserialize(&data)?;
            if stored.version != Self::STORE_VERSION {
                return Err(StoreError::VersionMismatch {
                    expected: Self::STORE_VERSION,
                    actual: stored.version,
                });
            }
            log::info!(
                "loaded correlation store from {} ({} entries)",
                path.display(),
                stored.entries.len()
            );
            stored.entries
        } else {
            log::info!(
                "correlation store {} does not exist yet, starting empty",
                path.display()
            );
            HashMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries: RwLock::new(entries),
        })
    }

    /// Record a new correlation. The write is flushed to disk before this
    /// returns; on a flush failure the in-memory insert is rolled back so
    /// memory never claims more than disk holds.
    pub fn put(&self, key: &str, issue_number: i64) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        if entries.contains_key(key) {
            return Err(StoreError::DuplicateKey(key.to_string()));
        }
        entries.insert(key.to_string(), issue_number);

        if let Err(err) = self.flush_locked(&entries) {
            entries.remove(key);
            return Err(err);
        }

        log::info!(
            "recorded correlation {} -> issue #{} ({} total)",
            key,
            issue_number,
            entries.len()
        );
        Ok(())
    }

    /// Exact lookup of the issue number for an outbound message identifier.
    pub fn get(&self, key: &str) -> Option<i64> {
        self.entries.read().get(key).copied()
    }

    /// All recorded correlations, sorted by key. Startup diagnostics and
    /// admin listings only; not on the webhook hot path.
    pub fn list_all(&self) -> Vec<(String, i64)> {
        let mut all: Vec<(String, i64)> = self
            .entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Number of recorded correlations.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when no correlation has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Path of the on-disk snapshot.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize the full map and atomically replace the snapshot.
    /// Called with the write lock held, which also serializes writers.
    fn flush_locked(&self, entries: &HashMap<String, i64>) -> Result<(), StoreError> {
        let stored = StoredCorrelations {
            version: Self::STORE_VERSION,
            entries: entries.clone(),
        };
        let data = bincode::serialize(&stored)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|err| StoreError::Io(err.error))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store_in(dir: &tempfile::TempDir) -> CorrelationStore {
        CorrelationStore::open(&dir.path().join("correlations.bin")).unwrap()
    }

    #[test]
    fn round_trip_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.put("msg-1", 42).unwrap();
        assert_eq!(store.get("msg-1"), Some(42));
        assert_eq!(store.get("unknown"), None);
    }

    #[test]
    fn duplicate_put_is_a_distinct_error_and_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.put("msg-1", 42).unwrap();
        store.put("msg-2", 7).unwrap();

        let err = store.put("msg-1", 99).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(ref k) if k == "msg-1"));

        // Stored value and unrelated entries are untouched.
        assert_eq!(store.get("msg-1"), Some(42));
        assert_eq!(store.get("msg-2"), Some(7));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn flush_failure_rolls_back_and_preserves_prior_entries() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir(&data_dir).unwrap();
        let path = data_dir.join("correlations.bin");

        let store = CorrelationStore::open(&path).unwrap();
        store.put("msg-1", 42).unwrap();

        // Park the snapshot directory so the next flush cannot write.
        let parked = dir.path().join("parked");
        std::fs::rename(&data_dir, &parked).unwrap();

        let err = store.put("msg-2", 7).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));

        // The failed insert is rolled back; the earlier entry is intact.
        assert_eq!(store.get("msg-2"), None);
        assert_eq!(store.get("msg-1"), Some(42));
        assert_eq!(store.len(), 1);

        std::fs::rename(&parked, &data_dir).unwrap();
        let reopened = CorrelationStore::open(&path).unwrap();
        assert_eq!(reopened.get("msg-1"), Some(42));
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn snapshot_with_unknown_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("correlations.bin");

        let stored = StoredCorrelations {
            version: 99,
            entries: HashMap::new(),
        };
        std::fs::write(&path, bincode::serialize(&stored).unwrap()).unwrap();

        let err = CorrelationStore::open(&path).unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionMismatch {
                expected: 1,
                actual: 99
            }
        ));
    }

    #[test]
    fn entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("correlations.bin");

        {
            let store = CorrelationStore::open(&path).unwrap();
            store.put("msg-1", 42).unwrap();
            store.put("msg-2", 7).unwrap();
        }

        let reopened = CorrelationStore::open(&path).unwrap();
        assert_eq!(reopened.get("msg-1"), Some(42));
        assert_eq!(reopened.get("msg-2"), Some(7));
        assert_eq!(reopened.len(), 2);
    }

    #[test]
    fn list_all_is_sorted_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.put("msg-b", 2).unwrap();
        store.put("msg-a", 1).unwrap();
        store.put("msg-c", 3).unwrap();

        assert_eq!(
            store.list_all(),
            vec![
                ("msg-a".to_string(), 1),
                ("msg-b".to_string(), 2),
                ("msg-c".to_string(), 3),
            ]
        );
    }

    #[test]
    fn concurrent_puts_and_gets_stay_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        store.put(&format!("msg-{w}-{i}"), (w * 100 + i) as i64).unwrap();
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for w in 0..4 {
                        for i in 0..10 {
                            // Either absent or the full written value; never torn.
                            if let Some(v) = store.get(&format!("msg-{w}-{i}")) {
                                assert_eq!(v, (w * 100 + i) as i64);
                            }
                        }
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 40);
        let reopened = CorrelationStore::open(store.path()).unwrap();
        assert_eq!(reopened.len(), 40);
    }
}
