// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Async front for the kubelet plugin calls.
//!
//! Kubelet sends claims in batches. Each claim in a batch is handled on the
//! blocking pool and gets its own result; one failing claim does not fail
//! the batch. The state lock still serializes the actual work.

use crate::{BoundDevice, Claim, DeviceState};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Per-claim answer to a prepare batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PrepareResult {
    pub devices: Vec<BoundDevice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-claim answer to an unprepare batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct UnprepareResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Driver {
    state: Arc<DeviceState>,
}

impl Driver {
    pub fn new(state: Arc<DeviceState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<DeviceState> {
        &self.state
    }

    /// Prepares every claim in the batch, keyed by claim UID.
    ///
    /// A UID repeated with identical content is prepared once. A UID
    /// repeated with different content is not prepared at all; its result
    /// carries an error.
    pub async fn node_prepare_resources(
        &self,
        claims: Vec<Claim>,
    ) -> BTreeMap<String, PrepareResult> {
        tracing::info!("NodePrepareResource called: {} claims", claims.len());

        let mut results: BTreeMap<String, PrepareResult> = BTreeMap::new();
        let mut batch: BTreeMap<String, Claim> = BTreeMap::new();
        for claim in claims {
            let repeat_of_same = batch.get(&claim.uid).map(|first| *first == claim);
            match repeat_of_same {
                None if !results.contains_key(&claim.uid) => {
                    batch.insert(claim.uid.clone(), claim);
                }
                Some(true) => {
                    tracing::debug!("claim '{}' repeated in batch; preparing once", claim.uid);
                }
                _ => {
                    tracing::error!(
                        "claim '{}' repeated in batch with different content",
                        claim.uid
                    );
                    batch.remove(&claim.uid);
                    results.insert(
                        claim.uid.clone(),
                        PrepareResult {
                            devices: Vec::new(),
                            error: Some(format!(
                                "claim {} repeated in batch with different content",
                                claim.uid
                            )),
                        },
                    );
                }
            }
        }

        let mut handles = Vec::with_capacity(batch.len());
        for (uid, claim) in batch {
            let state = Arc::clone(&self.state);
            handles.push((uid, tokio::task::spawn_blocking(move || state.prepare(&claim))));
        }

        for (uid, handle) in handles {
            let result = match handle.await {
                Ok(Ok(devices)) => PrepareResult {
                    devices,
                    error: None,
                },
                Ok(Err(e)) => {
                    tracing::error!("error preparing devices for claim '{uid}': {e}");
                    PrepareResult {
                        devices: Vec::new(),
                        error: Some(format!("error preparing devices for claim {uid}: {e}")),
                    }
                }
                Err(e) => PrepareResult {
                    devices: Vec::new(),
                    error: Some(format!("prepare task for claim {uid} failed: {e}")),
                },
            };
            results.insert(uid, result);
        }
        results
    }

    /// Unprepares every claim UID in the batch. Repeated UIDs are
    /// unprepared once.
    pub async fn node_unprepare_resources(
        &self,
        claim_uids: Vec<String>,
    ) -> BTreeMap<String, UnprepareResult> {
        tracing::info!("NodeUnprepareResource called: {} claims", claim_uids.len());

        let batch: BTreeSet<String> = claim_uids.into_iter().collect();

        let mut handles = Vec::with_capacity(batch.len());
        for uid in batch {
            let state = Arc::clone(&self.state);
            let task_uid = uid.clone();
            handles.push((
                uid,
                tokio::task::spawn_blocking(move || state.unprepare(&task_uid)),
            ));
        }

        let mut results = BTreeMap::new();
        for (uid, handle) in handles {
            let error = match handle.await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => {
                    tracing::error!("error unpreparing devices for claim '{uid}': {e}");
                    Some(format!("error unpreparing devices for claim {uid}: {e}"))
                }
                Err(e) => Some(format!("unprepare task for claim {uid} failed: {e}")),
            };
            results.insert(uid, UnprepareResult { error });
        }
        results
    }
}
