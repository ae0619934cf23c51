// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Extension point for hardware setup and teardown.
//!
//! The CPU driver needs no hardware configuration, so the default hook does
//! nothing. A driver that must program devices (partitioning, pinning,
//! power state) implements [`DeviceHook`] and passes it to
//! [`DeviceState::new`](crate::DeviceState::new).

use crate::PreparedDevice;

/// Error type returned by hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Per-claim hardware hooks, called with the driver lock held.
pub trait DeviceHook: Send + Sync {
    /// Called after a claim's devices are resolved and before its CDI spec
    /// is written. An error aborts the prepare; nothing is published.
    ///
    /// If writing the CDI spec or the checkpoint fails afterwards,
    /// [`DeviceHook::unprepare`] is called with the same devices before the
    /// error is returned, so a retried prepare starts from clean hardware.
    fn prepare(&self, _claim_uid: &str, _devices: &[PreparedDevice]) -> Result<(), HookError> {
        Ok(())
    }

    /// Called before a claim's CDI spec is removed, and to undo
    /// [`DeviceHook::prepare`] when a later prepare step fails. An error
    /// aborts the unprepare; the claim stays prepared. A retried unprepare
    /// calls it again, so it must tolerate devices already torn down.
    fn unprepare(&self, _claim_uid: &str, _devices: &[PreparedDevice]) -> Result<(), HookError> {
        Ok(())
    }
}

/// Hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl DeviceHook for NoopHook {}
