// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for checkpoint storage.

/// Errors that can occur while reading or writing checkpoints.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// An I/O operation on the checkpoint directory failed.
    #[error("checkpoint I/O failed on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// The named checkpoint does not exist.
    #[error("checkpoint '{0}' not found")]
    NotFound(String),

    /// The stored checksum does not match the stored data.
    #[error("checkpoint '{name}' is corrupt: {detail}")]
    Corrupt { name: String, detail: String },

    /// The checkpoint payload could not be serialised.
    #[error("failed to encode checkpoint '{name}': {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The checkpoint payload could not be deserialised.
    #[error("failed to decode checkpoint '{name}': {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// A checkpoint name that cannot be used as a file name.
    #[error("invalid checkpoint name '{0}'")]
    InvalidName(String),
}
