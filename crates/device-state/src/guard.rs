// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Exclusive access to the checkpoint.
//!
//! The checkpoint slot lives inside a mutex, so the only way to read or
//! write it is through a [`SnapshotGuard`]. Holding the guard is holding the
//! driver-wide lock: every prepare, unprepare and reconcile runs its whole
//! load → modify → commit sequence (including CDI spec writes) under one
//! guard, and no two such sequences interleave.
//!
//! The guard also holds an exclusive advisory lock on a file in the plugin
//! data directory, so a second process working on the same directory (the
//! CLI next to a running plugin) waits instead of reconciling against a
//! half-finished prepare.
//!
//! ```text
//! ClaimStore::lock()
//!       │  mutex, then file lock
//!       ▼
//!   SnapshotGuard ──► load() ──► mutate ──► commit()
//!       │
//!       │  drop()
//!       ▼
//!   file lock, then mutex released
//! ```

use crate::{CheckpointSnapshot, StateError};
use checkpoint_store::{CheckpointError, CheckpointSlot, CheckpointStore};
use fs4::fs_std::FileExt;
use parking_lot::{Mutex, MutexGuard};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub(crate) struct ClaimStore {
    slot: Mutex<CheckpointSlot<CheckpointSnapshot>>,
    lock_path: PathBuf,
}

impl ClaimStore {
    pub(crate) fn new(
        store: Arc<dyn CheckpointStore>,
        checkpoint_name: &str,
        lock_path: &Path,
    ) -> Self {
        Self {
            slot: Mutex::new(CheckpointSlot::new(store, checkpoint_name)),
            lock_path: lock_path.to_path_buf(),
        }
    }

    /// Blocks until both the in-process and the cross-process lock are free.
    pub(crate) fn lock(&self) -> Result<SnapshotGuard<'_>, StateError> {
        let slot = self.slot.lock();
        let file_lock = lock_file(&self.lock_path)?;
        Ok(SnapshotGuard {
            _file_lock: file_lock,
            slot,
        })
    }
}

/// Opens the lock file and takes an exclusive lock on it. Closing the file
/// releases the lock.
fn lock_file(path: &Path) -> Result<File, StateError> {
    let lock_err = |source| StateError::LockFailed {
        path: path.display().to_string(),
        source,
    };
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(lock_err)?;
    file.lock_exclusive().map_err(lock_err)?;
    Ok(file)
}

pub(crate) struct SnapshotGuard<'a> {
    // Declared first so it is released before the mutex.
    _file_lock: File,
    slot: MutexGuard<'a, CheckpointSlot<CheckpointSnapshot>>,
}

impl SnapshotGuard<'_> {
    /// Creates an empty checkpoint if none exists, then loads it.
    pub(crate) fn load_or_init(&self) -> Result<CheckpointSnapshot, StateError> {
        let snapshot = self
            .slot
            .load_or_init()
            .map_err(|source| StateError::CheckpointUnavailable {
                operation: "initialize",
                source,
            })?;
        self.check_version(snapshot, "initialize")
    }

    /// Reads the current snapshot.
    pub(crate) fn load(&self, operation: &'static str) -> Result<CheckpointSnapshot, StateError> {
        let snapshot = self
            .slot
            .get()
            .map_err(|source| StateError::CheckpointUnavailable { operation, source })?;
        self.check_version(snapshot, operation)
    }

    /// Atomically replaces the stored snapshot.
    pub(crate) fn commit(
        &self,
        snapshot: &CheckpointSnapshot,
        operation: &'static str,
        claim_uid: &str,
    ) -> Result<(), StateError> {
        self.slot
            .put(snapshot)
            .map_err(|source| StateError::CheckpointWriteFailed {
                operation,
                claim_uid: claim_uid.to_string(),
                source,
            })
    }

    fn check_version(
        &self,
        snapshot: CheckpointSnapshot,
        operation: &'static str,
    ) -> Result<CheckpointSnapshot, StateError> {
        if snapshot.is_supported() {
            return Ok(snapshot);
        }
        Err(StateError::CheckpointUnavailable {
            operation,
            source: CheckpointError::Corrupt {
                name: self.slot.name().to_string(),
                detail: format!("unsupported checkpoint version '{}'", snapshot.version),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PreparedClaim;
    use checkpoint_store::FileCheckpointStore;
    use tempfile::TempDir;

    fn claim_store(dir: &TempDir) -> (Arc<FileCheckpointStore>, ClaimStore) {
        let store = Arc::new(FileCheckpointStore::new(dir.path()).unwrap());
        (
            store.clone(),
            ClaimStore::new(store, "checkpoint.json", &dir.path().join(".lock")),
        )
    }

    #[test]
    fn test_init_load_commit() {
        let dir = TempDir::new().unwrap();
        let (_store, claims) = claim_store(&dir);

        let guard = claims.lock().unwrap();
        let mut snapshot = guard.load_or_init().unwrap();
        assert!(snapshot.prepared_claims.is_empty());

        snapshot
            .prepared_claims
            .insert("abc".into(), PreparedClaim::default());
        guard.commit(&snapshot, "prepare", "abc").unwrap();
        assert_eq!(guard.load("prepare").unwrap(), snapshot);
    }

    #[test]
    fn test_load_without_init_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let (_store, claims) = claim_store(&dir);
        let err = claims.lock().unwrap().load("prepare").unwrap_err();
        assert!(matches!(
            err,
            StateError::CheckpointUnavailable {
                operation: "prepare",
                source: CheckpointError::NotFound(_),
            }
        ));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let dir = TempDir::new().unwrap();
        let (store, claims) = claim_store(&dir);
        let future = CheckpointSnapshot {
            version: "v2".into(),
            ..Default::default()
        };
        CheckpointSlot::new(store, "checkpoint.json").put(&future).unwrap();

        let err = claims.lock().unwrap().load("unprepare").unwrap_err();
        assert!(err.to_string().contains("unsupported checkpoint version 'v2'"));
    }

    #[test]
    fn test_lock_is_exclusive() {
        let dir = TempDir::new().unwrap();
        let (_store, claims) = claim_store(&dir);
        let guard = claims.lock().unwrap();
        assert!(claims.slot.try_lock().is_none());
        drop(guard);
        assert!(claims.slot.try_lock().is_some());
    }

    #[test]
    fn test_file_lock_excludes_other_stores() {
        let dir = TempDir::new().unwrap();
        let (store, first) = claim_store(&dir);
        // A second store on the same directory stands in for another process.
        let second = ClaimStore::new(store, "checkpoint.json", &dir.path().join(".lock"));

        let guard = first.lock().unwrap();
        std::thread::scope(|s| {
            let waiter = s.spawn(|| {
                second.lock().unwrap();
            });
            std::thread::sleep(std::time::Duration::from_millis(100));
            assert!(!waiter.is_finished());

            drop(guard);
            waiter.join().unwrap();
        });
        assert!(dir.path().join(".lock").exists());
    }
}
