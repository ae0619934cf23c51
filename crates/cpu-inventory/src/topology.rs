// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! CPU topology: how hardware threads group into cores and NUMA nodes.
//!
//! The topology is either given explicitly (the synthetic layout used in
//! tests and demos) or derived from the online CPU list in sysfs.

use crate::InventoryError;
use std::path::Path;

/// Base sysfs path for CPU information.
const CPU_BASE: &str = "/sys/devices/system/cpu";

/// Largest number of hardware threads a topology may describe.
pub const MAX_THREADS: u32 = 1 << 16;

/// Layout of the node's hardware threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CpuTopology {
    /// Number of physical cores.
    pub cores: u32,
    /// Hardware threads per core (SMT width).
    pub threads_per_core: u32,
    /// Number of NUMA nodes; cores are split evenly across them.
    pub numa_nodes: u32,
}

impl CpuTopology {
    /// Creates a validated topology.
    ///
    /// Rejects zero-sized dimensions, more than [`MAX_THREADS`] threads and
    /// a core count that does not split evenly across NUMA nodes.
    pub fn new(cores: u32, threads_per_core: u32, numa_nodes: u32) -> Result<Self, InventoryError> {
        if cores == 0 || threads_per_core == 0 || numa_nodes == 0 {
            return Err(InventoryError::InvalidTopology(format!(
                "cores ({cores}), threads per core ({threads_per_core}) and NUMA nodes ({numa_nodes}) must all be non-zero"
            )));
        }
        match cores.checked_mul(threads_per_core) {
            Some(total) if total <= MAX_THREADS => {}
            _ => {
                return Err(InventoryError::InvalidTopology(format!(
                    "{cores} cores x {threads_per_core} threads exceeds {MAX_THREADS} hardware threads"
                )))
            }
        }
        if cores % numa_nodes != 0 {
            return Err(InventoryError::InvalidTopology(format!(
                "{cores} cores cannot be split evenly across {numa_nodes} NUMA nodes"
            )));
        }
        Ok(Self {
            cores,
            threads_per_core,
            numa_nodes,
        })
    }

    /// Derives a topology from the host's online hardware threads.
    ///
    /// The online thread count is divided by `threads_per_core` to obtain
    /// the core count.
    pub fn detect(threads_per_core: u32, numa_nodes: u32) -> Result<Self, InventoryError> {
        let threads = read_online_threads()?;
        if threads_per_core == 0 || threads % threads_per_core != 0 {
            return Err(InventoryError::InvalidTopology(format!(
                "{threads} online threads are not a multiple of {threads_per_core} threads per core"
            )));
        }
        let topology = Self::new(threads / threads_per_core, threads_per_core, numa_nodes)?;
        tracing::info!(
            "detected {} online threads ({} cores x {} threads, {} NUMA nodes)",
            threads,
            topology.cores,
            topology.threads_per_core,
            topology.numa_nodes,
        );
        Ok(topology)
    }

    /// Total number of hardware threads.
    pub fn total_threads(&self) -> u32 {
        self.cores * self.threads_per_core
    }

    /// Parent core of a thread. Threads are numbered core-major within each
    /// SMT sibling set: thread `t` belongs to core `t % cores`.
    pub fn core_of(&self, thread: u32) -> u32 {
        thread % self.cores
    }

    /// NUMA node of a core.
    pub fn numa_of(&self, core: u32) -> u32 {
        core / (self.cores / self.numa_nodes)
    }
}

/// Reads the number of online hardware threads.
///
/// Tries `/sys/devices/system/cpu/online` first, then falls back to
/// `std::thread::available_parallelism()`.
fn read_online_threads() -> Result<u32, InventoryError> {
    let online = format!("{CPU_BASE}/online");
    if let Ok(count) = read_online_threads_from(Path::new(&online)) {
        return Ok(count);
    }

    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .map_err(|e| InventoryError::ReadError {
            path: online,
            source: e,
        })
}

/// Reads and parses a CPU range file such as sysfs `online`.
pub(crate) fn read_online_threads_from(path: &Path) -> Result<u32, InventoryError> {
    let content = std::fs::read_to_string(path).map_err(|e| InventoryError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_cpu_range(content.trim()).ok_or_else(|| InventoryError::ParseError {
        path: path.display().to_string(),
        detail: format!("expected a CPU range list, got '{}'", content.trim()),
    })
}

/// Parses a CPU range string like `"0-3"` → 4, `"0"` → 1, `"0,2-3"` → 3.
fn parse_cpu_range(s: &str) -> Option<u32> {
    let mut total = 0u32;
    for part in s.split(',') {
        let part = part.trim();
        if let Some((start_s, end_s)) = part.split_once('-') {
            let start: u32 = start_s.trim().parse().ok()?;
            let end: u32 = end_s.trim().parse().ok()?;
            if end < start {
                return None;
            }
            total += end - start + 1;
        } else {
            let _: u32 = part.parse().ok()?;
            total += 1;
        }
    }
    if total > 0 {
        Some(total)
    } else {
        None
    }
}
