// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for inventory construction.

/// Errors that can occur while building the device inventory.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// Failed to read a sysfs file while detecting the host topology.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: String,
        source: std::io::Error,
    },

    /// A sysfs file did not contain the expected format.
    #[error("failed to parse value from {path}: {detail}")]
    ParseError { path: String, detail: String },

    /// The requested topology cannot be laid out.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// A capacity quantity string could not be parsed.
    #[error("invalid quantity '{input}': {detail}")]
    InvalidQuantity { input: String, detail: String },

    /// A version attribute was not of the form `MAJOR.MINOR.PATCH`.
    #[error("invalid version attribute '{0}': expected MAJOR.MINOR.PATCH")]
    InvalidVersion(String),
}
