// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for CDI spec publication.

/// Errors that can occur while writing, removing or listing CDI specs.
#[derive(Debug, thiserror::Error)]
pub enum CdiError {
    /// The spec directory could not be created.
    #[error("cannot prepare CDI root {path}: {source}")]
    Root {
        path: String,
        source: std::io::Error,
    },

    /// Writing a spec file failed. No partial file is left visible.
    #[error("failed to write CDI spec '{spec}': {source}")]
    Write {
        spec: String,
        source: std::io::Error,
    },

    /// Removing a spec file failed for a reason other than absence.
    #[error("failed to remove CDI spec '{spec}': {source}")]
    Remove {
        spec: String,
        source: std::io::Error,
    },

    /// Listing the spec directory failed.
    #[error("failed to list CDI specs in {path}: {source}")]
    List {
        path: String,
        source: std::io::Error,
    },

    /// The spec could not be serialised.
    #[error("failed to encode CDI spec '{spec}': {source}")]
    Encode {
        spec: String,
        #[source]
        source: serde_json::Error,
    },

    /// A name used to build a spec or device name contains characters CDI
    /// does not allow.
    #[error("invalid CDI name '{name}': {detail}")]
    InvalidName { name: String, detail: String },
}
