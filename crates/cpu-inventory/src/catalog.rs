// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The allocatable-unit catalog.
//!
//! Built once at startup from a [`CpuTopology`] and read-only afterwards.
//! One [`AllocatableUnit`] is produced per hardware thread, named
//! `cpu-<thread>`.

use crate::{AttributeValue, CpuTopology, InventoryError, Quantity};
use std::collections::{BTreeMap, HashMap};

/// Attribute holding the architecture name.
pub const ATTR_ARCHITECTURE: &str = "architecture";
/// Attribute holding the hardware thread id.
pub const ATTR_ID: &str = "id";
/// Attribute holding the parent core id.
pub const ATTR_PARENT_ID: &str = "parentID";
/// Attribute holding the NUMA node (locality domain).
pub const ATTR_NUMA: &str = "dra.nvidia.com/numa";
/// Attribute holding the driver version.
pub const ATTR_DRIVER_VERSION: &str = "driverVersion";
/// Capacity entry for memory reachable from the unit.
pub const CAPACITY_MEMORY: &str = "memory";

const DRIVER_VERSION: &str = "1.0.0";
const MEMORY_PER_UNIT_GI: u64 = 80;

/// One schedulable hardware thread.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AllocatableUnit {
    /// Device name, e.g. `cpu-5`.
    pub name: String,
    /// Typed attributes keyed by qualified name.
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Capacity entries keyed by name.
    pub capacity: BTreeMap<String, Quantity>,
}

impl AllocatableUnit {
    /// Hardware thread id (`id` attribute).
    pub fn thread_id(&self) -> Option<i64> {
        self.int_attribute(ATTR_ID)
    }

    /// Parent core id (`parentID` attribute).
    pub fn parent_id(&self) -> Option<i64> {
        self.int_attribute(ATTR_PARENT_ID)
    }

    /// NUMA node (locality domain).
    pub fn numa_node(&self) -> Option<i64> {
        self.int_attribute(ATTR_NUMA)
    }

    fn int_attribute(&self, key: &str) -> Option<i64> {
        self.attributes.get(key).and_then(AttributeValue::as_int)
    }
}

/// Static map of unit name → [`AllocatableUnit`], in thread order.
#[derive(Debug, Clone)]
pub struct InventoryCatalog {
    units: Vec<AllocatableUnit>,
    index: HashMap<String, usize>,
}

impl InventoryCatalog {
    /// Enumerates one unit per hardware thread of `topology`.
    pub fn enumerate(topology: &CpuTopology) -> Result<Self, InventoryError> {
        let mut units = Vec::with_capacity(topology.total_threads() as usize);

        for thread in 0..topology.total_threads() {
            let core = topology.core_of(thread);
            let numa = topology.numa_of(core);
            tracing::debug!("id: {thread} parentID: {core} numaNode: {numa}");

            let attributes = BTreeMap::from([
                (
                    ATTR_ARCHITECTURE.to_string(),
                    AttributeValue::String(go_arch().to_string()),
                ),
                (ATTR_ID.to_string(), AttributeValue::Int(thread.into())),
                (ATTR_PARENT_ID.to_string(), AttributeValue::Int(core.into())),
                (ATTR_NUMA.to_string(), AttributeValue::Int(numa.into())),
                (
                    ATTR_DRIVER_VERSION.to_string(),
                    AttributeValue::version(DRIVER_VERSION)?,
                ),
            ]);
            let capacity = BTreeMap::from([(
                CAPACITY_MEMORY.to_string(),
                Quantity::from_gi(MEMORY_PER_UNIT_GI),
            )]);

            units.push(AllocatableUnit {
                name: format!("cpu-{thread}"),
                attributes,
                capacity,
            });
        }

        tracing::info!(
            "enumerated {} allocatable CPU units across {} NUMA nodes",
            units.len(),
            topology.numa_nodes,
        );
        Ok(Self::from_units(units))
    }

    /// Builds a catalog from an explicit unit list, keeping its order.
    pub fn from_units(units: Vec<AllocatableUnit>) -> Self {
        let index = units
            .iter()
            .enumerate()
            .map(|(i, u)| (u.name.clone(), i))
            .collect();
        Self { units, index }
    }

    /// Looks up a unit by device name.
    pub fn get(&self, name: &str) -> Option<&AllocatableUnit> {
        self.index.get(name).map(|&i| &self.units[i])
    }

    /// Returns the hardware thread id of the named unit.
    pub fn thread_id(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(AllocatableUnit::thread_id)
    }

    /// Iterates units in thread order.
    pub fn iter(&self) -> impl Iterator<Item = &AllocatableUnit> {
        self.units.iter()
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the catalog has no units.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Groups unit names by NUMA node.
    pub fn by_numa_node(&self) -> BTreeMap<i64, Vec<&str>> {
        let mut groups: BTreeMap<i64, Vec<&str>> = BTreeMap::new();
        for unit in &self.units {
            if let Some(numa) = unit.numa_node() {
                groups.entry(numa).or_default().push(&unit.name);
            }
        }
        groups
    }
}

/// Architecture name in the form cluster tooling reports it.
fn go_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        other => other,
    }
}
