// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The publisher seam between claim state and the descriptor store.

use crate::{CdiError, ContainerEdits};

/// Writes and removes the descriptor artifacts a container runtime reads.
///
/// Implementations must make each write atomic from the caller's point of
/// view and must map the same claim UID to the same artifact every time, so
/// a retried publish converges.
pub trait DescriptorPublisher: Send + Sync {
    /// (Re)writes the baseline spec applied to every claim.
    fn publish_common(&self) -> Result<(), CdiError>;

    /// Writes the spec for one claim, overwriting any previous version.
    fn publish_claim(
        &self,
        claim_uid: &str,
        device_names: &[String],
        edits: &ContainerEdits,
    ) -> Result<(), CdiError>;

    /// Removes a claim's spec. Succeeds if it does not exist.
    fn retract_claim(&self, claim_uid: &str) -> Result<(), CdiError>;

    /// Qualified device names a container must request for the given claim
    /// devices: the common device first, then one per device. No I/O.
    fn resolve_names(&self, claim_uid: &str, device_names: &[String]) -> Vec<String>;

    /// Claim UIDs that currently have a published spec.
    fn published_claims(&self) -> Result<Vec<String>, CdiError>;
}
