// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Prepared state: what the checkpoint remembers about each claim.
//!
//! # Checkpoint Data
//! ```json
//! {
//!   "version": "v1",
//!   "preparedClaims": {
//!     "abc": {
//!       "devices": [
//!         {
//!           "requestNames": ["cpus"],
//!           "poolName": "worker-1",
//!           "deviceName": "cpu-5",
//!           "cdiDeviceIds": [
//!             "k8s.cpu.nvidia.com/cpu=common",
//!             "k8s.cpu.nvidia.com/cpu=abc-cpu-5"
//!           ]
//!         }
//!       ],
//!       "containerEdits": { "env": ["CPU_my-claim=5"] }
//!     }
//!   }
//! }
//! ```

use cdi_publisher::ContainerEdits;
use std::collections::BTreeMap;

/// Schema tag of the checkpoint data this crate reads and writes.
pub const CHECKPOINT_VERSION: &str = "v1";

/// One bound unit of a prepared claim.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedDevice {
    /// Requests this unit satisfies. No duplicates, first-seen order.
    pub request_names: Vec<String>,
    /// Pool the unit belongs to.
    pub pool_name: String,
    /// Unit name, e.g. `cpu-5`.
    pub device_name: String,
    /// Qualified CDI device names a container must request.
    pub cdi_device_ids: Vec<String>,
}

/// Handle handed back to the driver front for each bound unit.
pub type BoundDevice = PreparedDevice;

/// Everything needed to describe, and if necessary re-publish, one
/// prepared claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedClaim {
    /// Bound units, in allocation order.
    pub devices: Vec<PreparedDevice>,
    /// Edits written into the claim's CDI spec.
    #[serde(default)]
    pub container_edits: ContainerEdits,
}

impl PreparedClaim {
    /// Unit names, in allocation order.
    pub fn device_names(&self) -> Vec<String> {
        self.devices.iter().map(|d| d.device_name.clone()).collect()
    }
}

/// The single durable document: claim UID → prepared claim.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointSnapshot {
    /// Schema tag, [`CHECKPOINT_VERSION`] for data written by this crate.
    pub version: String,
    /// Prepared claims keyed by claim UID.
    #[serde(default)]
    pub prepared_claims: BTreeMap<String, PreparedClaim>,
}

impl Default for CheckpointSnapshot {
    fn default() -> Self {
        Self {
            version: CHECKPOINT_VERSION.to_string(),
            prepared_claims: BTreeMap::new(),
        }
    }
}

impl CheckpointSnapshot {
    /// Whether this snapshot uses a schema this crate understands.
    pub fn is_supported(&self) -> bool {
        self.version == CHECKPOINT_VERSION
    }
}
