// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # device-state
//!
//! Node-local claim state for the CPU DRA driver.
//!
//! [`DeviceState`] turns allocated claims into bound devices. It resolves
//! units against the [`cpu_inventory`] catalog, publishes per-claim CDI
//! specs through [`cdi_publisher`] and records prepared claims in a
//! [`checkpoint_store`] checkpoint. Prepare and unprepare are idempotent and
//! fully serialized; [`DeviceState::reconcile`] repairs the divergence a
//! crash between the spec write and the checkpoint write can leave behind.
//!
//! [`Driver`] is the async batch front used by the plugin server and the
//! CLI.

mod claim;
mod config;
pub mod cpu_config;
mod driver;
mod error;
mod guard;
mod hooks;
mod prepared;
mod reconcile;
mod state;
mod stats;

pub use claim::{AllocationResult, Claim, DeviceAllocationResult};
pub use config::{ConfigError, DriverConfig, InventorySource};
pub use cpu_config::CpuConfig;
pub use driver::{Driver, PrepareResult, UnprepareResult};
pub use error::StateError;
pub use hooks::{DeviceHook, HookError, NoopHook};
pub use prepared::{
    BoundDevice, CheckpointSnapshot, PreparedClaim, PreparedDevice, CHECKPOINT_VERSION,
};
pub use reconcile::ReconcileReport;
pub use state::DeviceState;
pub use stats::StateStats;
