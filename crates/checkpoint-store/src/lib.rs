// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # checkpoint-store
//!
//! Durable storage for the driver's checkpoint.
//!
//! - [`CheckpointStore`]: a flat blob store with atomic create/overwrite,
//!   list and remove.
//! - [`FileCheckpointStore`]: one file per checkpoint; writes go through a
//!   synced temporary file and a rename.
//! - [`CheckpointSlot`]: a typed view over one named checkpoint with
//!   `load_or_init`, `get` and `put`, verifying a SHA-256 checksum on every
//!   read.
//!
//! Atomicity is scoped to a single checkpoint; there are no multi-key
//! transactions.
//!
//! # Example
//! ```
//! use checkpoint_store::{CheckpointSlot, FileCheckpointStore};
//! use std::sync::Arc;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = Arc::new(FileCheckpointStore::new(dir.path()).unwrap());
//! let slot: CheckpointSlot<Vec<String>> = CheckpointSlot::new(store, "checkpoint.json");
//!
//! assert!(slot.load_or_init().unwrap().is_empty());
//! slot.put(&vec!["abc".to_string()]).unwrap();
//! assert_eq!(slot.get().unwrap(), vec!["abc".to_string()]);
//! ```

mod error;
mod slot;
mod store;

pub use error::CheckpointError;
pub use slot::CheckpointSlot;
pub use store::{CheckpointStore, FileCheckpointStore};
