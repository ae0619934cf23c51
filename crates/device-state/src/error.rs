// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for claim preparation.
//!
//! Every variant names the operation and, where there is one, the claim it
//! was working on, so a failure reported through the driver front can be
//! diagnosed without reading the checkpoint.

use cdi_publisher::CdiError;
use checkpoint_store::CheckpointError;

/// Errors surfaced by [`DeviceState`](crate::DeviceState).
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The checkpoint could not be loaded (missing, unreadable, corrupt or
    /// of an unknown version).
    #[error("{operation}: checkpoint unavailable: {source}")]
    CheckpointUnavailable {
        operation: &'static str,
        #[source]
        source: CheckpointError,
    },

    /// The claim has no allocation decision yet.
    #[error("claim '{claim_uid}' is not yet allocated")]
    ClaimNotAllocated { claim_uid: String },

    /// The claim is malformed.
    #[error("invalid claim: {0}")]
    InvalidClaim(String),

    /// A result for this driver names a unit the inventory does not have.
    #[error("claim '{claim_uid}' references unknown device '{device}'")]
    UnknownDevice { claim_uid: String, device: String },

    /// Writing the claim's CDI spec failed; the checkpoint was not touched.
    #[error("{operation} '{claim_uid}': unable to write CDI spec: {source}")]
    DescriptorWriteFailed {
        operation: &'static str,
        claim_uid: String,
        #[source]
        source: CdiError,
    },

    /// Deleting the claim's CDI spec failed; the checkpoint was not touched.
    #[error("{operation} '{claim_uid}': unable to delete CDI spec: {source}")]
    DescriptorDeleteFailed {
        operation: &'static str,
        claim_uid: String,
        #[source]
        source: CdiError,
    },

    /// Listing published CDI specs failed.
    #[error("reconcile: unable to list CDI specs: {0}")]
    DescriptorListFailed(#[source] CdiError),

    /// Writing the updated checkpoint failed.
    #[error("{operation} '{claim_uid}': unable to write checkpoint: {source}")]
    CheckpointWriteFailed {
        operation: &'static str,
        claim_uid: String,
        #[source]
        source: CheckpointError,
    },

    /// A [`DeviceHook`](crate::DeviceHook) rejected the claim.
    #[error("{operation} '{claim_uid}': device hook failed: {source}")]
    HookFailed {
        operation: &'static str,
        claim_uid: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The cross-process state lock could not be taken.
    #[error("unable to lock {path}: {source}")]
    LockFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::ConfigError),

    /// Inventory construction failed.
    #[error("inventory error: {0}")]
    Inventory(#[from] cpu_inventory::InventoryError),

    /// Startup could not complete.
    #[error("initialization failed: {0}")]
    Initialization(String),
}
