// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A typed, checksummed, single-slot view over a [`CheckpointStore`].
//!
//! # Envelope
//! ```json
//! {
//!   "checksum": "9f86d081884c7d65...",
//!   "data": { ... }
//! }
//! ```
//!
//! The checksum is the SHA-256 of the canonical JSON encoding of `data`
//! (object keys sorted). A mismatch on read means the file was truncated
//! or edited by hand, and the slot refuses to hand it out.

use crate::{CheckpointError, CheckpointStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::marker::PhantomData;
use std::sync::Arc;

#[derive(serde::Serialize)]
struct EnvelopeRef<'a> {
    checksum: String,
    data: &'a serde_json::Value,
}

#[derive(serde::Deserialize)]
struct Envelope {
    checksum: String,
    data: serde_json::Value,
}

/// One named checkpoint holding a value of type `T`.
pub struct CheckpointSlot<T> {
    store: Arc<dyn CheckpointStore>,
    name: String,
    _value: PhantomData<fn() -> T>,
}

impl<T> CheckpointSlot<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Binds a slot to `name` in `store`. No I/O happens here.
    pub fn new(store: Arc<dyn CheckpointStore>, name: &str) -> Self {
        Self {
            store,
            name: name.to_string(),
            _value: PhantomData,
        }
    }

    /// The checkpoint name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stored value, creating it from `T::default()` first if
    /// the slot has never been written. Calling it again is harmless.
    pub fn load_or_init(&self) -> Result<T, CheckpointError> {
        let exists = self.store.list()?.iter().any(|n| n == &self.name);
        if exists {
            return self.get();
        }

        let value = T::default();
        self.put(&value)?;
        tracing::info!("created checkpoint '{}'", self.name);
        Ok(value)
    }

    /// Reads and verifies the stored value.
    pub fn get(&self) -> Result<T, CheckpointError> {
        let bytes = self.store.read(&self.name)?;
        let envelope: Envelope =
            serde_json::from_slice(&bytes).map_err(|e| CheckpointError::Decode {
                name: self.name.clone(),
                source: e,
            })?;

        let actual = checksum(&envelope.data).map_err(|e| CheckpointError::Decode {
            name: self.name.clone(),
            source: e,
        })?;
        if actual != envelope.checksum {
            return Err(CheckpointError::Corrupt {
                name: self.name.clone(),
                detail: format!(
                    "checksum mismatch (stored {}, computed {actual})",
                    envelope.checksum
                ),
            });
        }

        serde_json::from_value(envelope.data).map_err(|e| CheckpointError::Decode {
            name: self.name.clone(),
            source: e,
        })
    }

    /// Atomically replaces the stored value.
    pub fn put(&self, value: &T) -> Result<(), CheckpointError> {
        let encode_err = |e| CheckpointError::Encode {
            name: self.name.clone(),
            source: e,
        };
        let data = serde_json::to_value(value).map_err(encode_err)?;
        let envelope = EnvelopeRef {
            checksum: checksum(&data).map_err(encode_err)?,
            data: &data,
        };
        let bytes = serde_json::to_vec_pretty(&envelope).map_err(encode_err)?;
        self.store.write(&self.name, &bytes)
    }
}

/// SHA-256 over the canonical encoding of `data`, as lowercase hex.
///
/// `serde_json::Value` keeps object keys sorted, so equal values always
/// encode to equal bytes.
fn checksum(data: &serde_json::Value) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_vec(data)?;
    Ok(format!("{:x}", Sha256::digest(&canonical)))
}
