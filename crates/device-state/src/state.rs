// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The claim preparation state machine.
//!
//! Each claim is either **absent** (no checkpoint entry, no claim spec) or
//! **bound** (checkpoint entry and claim spec both present). [`DeviceState`]
//! moves claims between the two:
//!
//! ```text
//!            prepare(claim)                  unprepare(uid)
//! Absent ───────────────────► Bound ───────────────────────► Absent
//!   1. load checkpoint                1. load checkpoint
//!   2. resolve devices                2. hook teardown
//!   3. write claim spec               3. remove claim spec
//!   4. commit checkpoint              4. commit checkpoint
//! ```
//!
//! The checkpoint is re-read at the start of every call; nothing about
//! claims is cached in memory. All calls are serialized by one lock, for
//! unrelated claims too.
//!
//! # Orphaned specs
//! The claim spec is written before the checkpoint. If the checkpoint write
//! fails, or the process dies in between, the spec is left without an
//! entry. No rollback is attempted; [`DeviceState::reconcile`] removes such
//! specs and runs on every startup.

use crate::guard::ClaimStore;
use crate::{
    BoundDevice, Claim, DeviceHook, DriverConfig, NoopHook, PreparedClaim, PreparedDevice,
    StateError, StateStats,
};
use cdi_publisher::{CdiHandler, ContainerEdits, DescriptorPublisher};
use checkpoint_store::{CheckpointStore, FileCheckpointStore};
use cpu_inventory::InventoryCatalog;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Separator between thread ids in the claim's environment edit.
const THREAD_ID_SEPARATOR: &str = ",";

/// Node-local claim state for one driver.
///
/// # Example
/// ```no_run
/// use device_state::{Claim, DeviceState, DriverConfig};
/// use std::path::Path;
///
/// # fn example() -> Result<(), device_state::StateError> {
/// let state = DeviceState::open(&DriverConfig::default())?;
/// let claim = Claim::from_file(Path::new("claim.json"))?;
/// let devices = state.prepare(&claim)?;
/// println!("bound {} devices", devices.len());
/// state.unprepare(&claim.uid)?;
/// # Ok(())
/// # }
/// ```
pub struct DeviceState {
    driver_name: String,
    catalog: InventoryCatalog,
    publisher: Arc<dyn DescriptorPublisher>,
    pub(crate) claims: ClaimStore,
    hook: Box<dyn DeviceHook>,
    pub(crate) stats: Mutex<StateStats>,
}

impl DeviceState {
    /// Opens the file-backed CDI root and checkpoint directory named by
    /// `config`, with no device hook, and runs the startup sequence of
    /// [`DeviceState::new`].
    pub fn open(config: &DriverConfig) -> Result<Self, StateError> {
        let (publisher, store) = file_backends(config)?;
        Self::new(config, publisher, store, Box::new(NoopHook))
    }

    /// Like [`DeviceState::open`], but attaches through
    /// [`DeviceState::attach`]: nothing is written until the caller
    /// prepares, unprepares or reconciles.
    pub fn open_attached(config: &DriverConfig) -> Result<Self, StateError> {
        let (publisher, store) = file_backends(config)?;
        Self::attach(config, publisher, store, Box::new(NoopHook))
    }

    /// Builds the state manager and brings the node to a consistent state.
    ///
    /// Steps:
    /// 1. Validate the config and enumerate the inventory.
    /// 2. Publish the common CDI spec.
    /// 3. Create the checkpoint if it does not exist yet.
    /// 4. Reconcile published claim specs against the checkpoint.
    pub fn new(
        config: &DriverConfig,
        publisher: Arc<dyn DescriptorPublisher>,
        store: Arc<dyn CheckpointStore>,
        hook: Box<dyn DeviceHook>,
    ) -> Result<Self, StateError> {
        let state = Self::assemble(config, publisher, store, hook)?;

        state.publisher.publish_common().map_err(|e| {
            StateError::Initialization(format!(
                "unable to create CDI spec file for common edits: {e}"
            ))
        })?;

        let snapshot = state.claims.lock()?.load_or_init()?;
        tracing::info!(
            "checkpoint '{}' holds {} prepared claims",
            config.checkpoint_file,
            snapshot.prepared_claims.len()
        );

        let report = state.reconcile()?;
        if !report.is_clean() {
            tracing::warn!("startup reconcile: {}", report.summary());
        }

        Ok(state)
    }

    /// Builds a state manager over an already initialized node without the
    /// startup writes of [`DeviceState::new`]. Fails with
    /// [`StateError::CheckpointUnavailable`] if the checkpoint does not
    /// exist yet.
    pub fn attach(
        config: &DriverConfig,
        publisher: Arc<dyn DescriptorPublisher>,
        store: Arc<dyn CheckpointStore>,
        hook: Box<dyn DeviceHook>,
    ) -> Result<Self, StateError> {
        let state = Self::assemble(config, publisher, store, hook)?;
        let snapshot = state.claims.lock()?.load("attach")?;
        tracing::debug!(
            "attached to checkpoint '{}' with {} prepared claims",
            config.checkpoint_file,
            snapshot.prepared_claims.len()
        );
        Ok(state)
    }

    fn assemble(
        config: &DriverConfig,
        publisher: Arc<dyn DescriptorPublisher>,
        store: Arc<dyn CheckpointStore>,
        hook: Box<dyn DeviceHook>,
    ) -> Result<Self, StateError> {
        config.validate()?;
        let catalog = InventoryCatalog::enumerate(&config.topology()?)?;

        std::fs::create_dir_all(&config.plugin_data_dir).map_err(|e| {
            StateError::Initialization(format!(
                "unable to create plugin data directory {}: {e}",
                config.plugin_data_dir.display()
            ))
        })?;

        Ok(Self {
            driver_name: config.driver_name.clone(),
            catalog,
            publisher,
            claims: ClaimStore::new(store, &config.checkpoint_file, &config.lock_path()),
            hook,
            stats: Mutex::new(StateStats::default()),
        })
    }

    /// Prepares a claim and returns its bound devices.
    ///
    /// Preparing a claim that is already bound returns the recorded devices
    /// without resolving or publishing anything again.
    pub fn prepare(&self, claim: &Claim) -> Result<Vec<BoundDevice>, StateError> {
        let result = self.prepare_locked(claim);
        if result.is_err() {
            self.stats.lock().record_failure();
        }
        result
    }

    /// Unprepares a claim. Unknown or already-unprepared claims succeed
    /// without doing anything.
    pub fn unprepare(&self, claim_uid: &str) -> Result<(), StateError> {
        let result = self.unprepare_locked(claim_uid);
        if result.is_err() {
            self.stats.lock().record_failure();
        }
        result
    }

    /// Current prepared claims, read from the checkpoint.
    pub fn prepared_claims(&self) -> Result<BTreeMap<String, PreparedClaim>, StateError> {
        let guard = self.claims.lock()?;
        Ok(guard.load("list")?.prepared_claims)
    }

    /// The inventory this driver serves.
    pub fn catalog(&self) -> &InventoryCatalog {
        &self.catalog
    }

    /// Driver identity used to filter allocation results.
    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    /// Snapshot of the operation counters.
    pub fn stats(&self) -> StateStats {
        self.stats.lock().clone()
    }

    pub(crate) fn publisher(&self) -> &dyn DescriptorPublisher {
        self.publisher.as_ref()
    }

    fn prepare_locked(&self, claim: &Claim) -> Result<Vec<BoundDevice>, StateError> {
        claim.validate()?;

        let guard = self.claims.lock()?;
        let mut snapshot = guard.load("prepare")?;

        if let Some(prepared) = snapshot.prepared_claims.get(&claim.uid) {
            tracing::debug!("claim '{}' already prepared", claim.uid);
            self.stats.lock().record_idempotent_prepare();
            return Ok(prepared.devices.clone());
        }

        let devices = self.prepare_devices(claim)?;
        let edits = self.container_edits(claim, &devices)?;

        self.hook
            .prepare(&claim.uid, &devices)
            .map_err(|source| StateError::HookFailed {
                operation: "prepare",
                claim_uid: claim.uid.clone(),
                source,
            })?;

        let device_names: Vec<String> = devices.iter().map(|d| d.device_name.clone()).collect();
        if let Err(source) = self.publisher.publish_claim(&claim.uid, &device_names, &edits) {
            self.undo_hook(&claim.uid, &devices);
            return Err(StateError::DescriptorWriteFailed {
                operation: "prepare",
                claim_uid: claim.uid.clone(),
                source,
            });
        }

        snapshot.prepared_claims.insert(
            claim.uid.clone(),
            PreparedClaim {
                devices: devices.clone(),
                container_edits: edits,
            },
        );
        if let Err(e) = guard.commit(&snapshot, "prepare", &claim.uid) {
            tracing::warn!(
                "claim '{}' has a CDI spec but no checkpoint entry; the next reconcile removes it",
                claim.uid
            );
            self.undo_hook(&claim.uid, &devices);
            return Err(e);
        }

        self.stats.lock().record_prepare();
        tracing::info!(
            "prepared claim '{}' ({}/{}) with {} devices",
            claim.uid,
            claim.namespace,
            claim.name,
            devices.len()
        );
        Ok(devices)
    }

    fn unprepare_locked(&self, claim_uid: &str) -> Result<(), StateError> {
        let guard = self.claims.lock()?;
        let mut snapshot = guard.load("unprepare")?;

        let Some(prepared) = snapshot.prepared_claims.get(claim_uid) else {
            tracing::debug!("claim '{claim_uid}' not prepared; nothing to do");
            self.stats.lock().record_noop_unprepare();
            return Ok(());
        };

        self.hook
            .unprepare(claim_uid, &prepared.devices)
            .map_err(|source| StateError::HookFailed {
                operation: "unprepare",
                claim_uid: claim_uid.to_string(),
                source,
            })?;

        self.publisher
            .retract_claim(claim_uid)
            .map_err(|source| StateError::DescriptorDeleteFailed {
                operation: "unprepare",
                claim_uid: claim_uid.to_string(),
                source,
            })?;

        snapshot.prepared_claims.remove(claim_uid);
        guard.commit(&snapshot, "unprepare", claim_uid)?;

        self.stats.lock().record_unprepare();
        tracing::info!("unprepared claim '{claim_uid}'");
        Ok(())
    }

    /// Reverts a successful `hook.prepare` after a later prepare step failed.
    fn undo_hook(&self, claim_uid: &str, devices: &[PreparedDevice]) {
        if let Err(e) = self.hook.unprepare(claim_uid, devices) {
            tracing::warn!("claim '{claim_uid}': device hook teardown after failed prepare: {e}");
        }
    }

    /// Turns this driver's allocation results into prepared devices.
    ///
    /// Results naming the same unit merge into one device carrying every
    /// request name.
    fn prepare_devices(&self, claim: &Claim) -> Result<Vec<PreparedDevice>, StateError> {
        let results = claim.results_for_driver(&self.driver_name)?;

        let mut devices: Vec<PreparedDevice> = Vec::with_capacity(results.len());
        for result in results {
            let existing = devices
                .iter_mut()
                .find(|d| d.pool_name == result.pool && d.device_name == result.device);
            if let Some(device) = existing {
                if !device.request_names.contains(&result.request) {
                    device.request_names.push(result.request.clone());
                }
                continue;
            }

            devices.push(PreparedDevice {
                request_names: vec![result.request.clone()],
                pool_name: result.pool.clone(),
                device_name: result.device.clone(),
                cdi_device_ids: self
                    .publisher
                    .resolve_names(&claim.uid, std::slice::from_ref(&result.device)),
            });
        }
        Ok(devices)
    }

    /// Builds `CPU_<claimName>=<thread ids>` from the catalog's `id`
    /// attribute of each device. No devices, no edits.
    fn container_edits(
        &self,
        claim: &Claim,
        devices: &[PreparedDevice],
    ) -> Result<ContainerEdits, StateError> {
        if devices.is_empty() {
            return Ok(ContainerEdits::default());
        }

        let thread_ids = devices
            .iter()
            .map(|d| {
                self.catalog
                    .thread_id(&d.device_name)
                    .map(|id| id.to_string())
                    .ok_or_else(|| StateError::UnknownDevice {
                        claim_uid: claim.uid.clone(),
                        device: d.device_name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ContainerEdits::env(
            &format!("CPU_{}", claim.name),
            &thread_ids.join(THREAD_ID_SEPARATOR),
        ))
    }
}

fn file_backends(
    config: &DriverConfig,
) -> Result<(Arc<dyn DescriptorPublisher>, Arc<dyn CheckpointStore>), StateError> {
    let publisher = CdiHandler::new(&config.cdi_root, &config.driver_name, &config.node_name)
        .map_err(|e| StateError::Initialization(format!("unable to create CDI handler: {e}")))?;
    let store = FileCheckpointStore::new(&config.plugin_data_dir).map_err(|e| {
        StateError::Initialization(format!("unable to create checkpoint store: {e}"))
    })?;
    Ok((Arc::new(publisher), Arc::new(store)))
}

impl std::fmt::Debug for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceState")
            .field("driver_name", &self.driver_name)
            .field("units", &self.catalog.len())
            .field("stats", &self.stats())
            .finish()
    }
}
