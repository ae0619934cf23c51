// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Repairs divergence between published claim specs and the checkpoint.
//!
//! The checkpoint is authoritative:
//! - a claim spec with no checkpoint entry is an orphan and is removed;
//! - a checkpoint entry with no claim spec gets its spec written again from
//!   the recorded devices and container edits.

use crate::{DeviceState, StateError};
use std::collections::BTreeSet;

/// Outcome of one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReconcileReport {
    /// Claim UIDs whose orphaned spec was removed.
    pub removed: Vec<String>,
    /// Claim UIDs whose missing spec was written again.
    pub restored: Vec<String>,
}

impl ReconcileReport {
    /// True when nothing had to be repaired.
    pub fn is_clean(&self) -> bool {
        self.removed.is_empty() && self.restored.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "removed {} orphaned specs, restored {} missing specs",
            self.removed.len(),
            self.restored.len()
        )
    }
}

impl DeviceState {
    /// Runs one reconcile pass under the state lock.
    pub fn reconcile(&self) -> Result<ReconcileReport, StateError> {
        let guard = self.claims.lock()?;
        let snapshot = guard.load("reconcile")?;

        let published: BTreeSet<String> = self
            .publisher()
            .published_claims()
            .map_err(StateError::DescriptorListFailed)?
            .into_iter()
            .collect();

        let mut report = ReconcileReport::default();

        for uid in published.iter() {
            if snapshot.prepared_claims.contains_key(uid) {
                continue;
            }
            self.publisher()
                .retract_claim(uid)
                .map_err(|source| StateError::DescriptorDeleteFailed {
                    operation: "reconcile",
                    claim_uid: uid.clone(),
                    source,
                })?;
            tracing::info!("removed orphaned CDI spec for claim '{uid}'");
            report.removed.push(uid.clone());
        }

        for (uid, prepared) in &snapshot.prepared_claims {
            if published.contains(uid) {
                continue;
            }
            self.publisher()
                .publish_claim(uid, &prepared.device_names(), &prepared.container_edits)
                .map_err(|source| StateError::DescriptorWriteFailed {
                    operation: "reconcile",
                    claim_uid: uid.clone(),
                    source,
                })?;
            tracing::info!("restored missing CDI spec for claim '{uid}'");
            report.restored.push(uid.clone());
        }

        self.stats
            .lock()
            .record_reconcile(report.removed.len(), report.restored.len());
        tracing::debug!("reconcile: {}", report.summary());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report() {
        let mut report = ReconcileReport::default();
        assert!(report.is_clean());
        report.removed.push("abc".into());
        assert!(!report.is_clean());
        assert_eq!(
            report.summary(),
            "removed 1 orphaned specs, restored 0 missing specs"
        );
    }
}
