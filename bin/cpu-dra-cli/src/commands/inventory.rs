// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `cpu-dra inventory` command: list allocatable units by NUMA node.

use cpu_inventory::catalog::{ATTR_ARCHITECTURE, CAPACITY_MEMORY};
use cpu_inventory::InventoryCatalog;
use device_state::DriverConfig;

pub async fn execute(config: &DriverConfig) -> anyhow::Result<()> {
    let topology = config.topology()?;
    let catalog = InventoryCatalog::enumerate(&topology)?;

    println!("  Driver:     {}", config.driver_name);
    println!("  Node:       {}", config.node_name);
    println!(
        "  Topology:   {} cores x {} threads, {} NUMA nodes",
        topology.cores, topology.threads_per_core, topology.numa_nodes,
    );
    println!("  Units:      {}", catalog.len());
    if let Some(unit) = catalog.iter().next() {
        if let Some(arch) = unit.attributes.get(ATTR_ARCHITECTURE) {
            println!("  Arch:       {arch}");
        }
        if let Some(memory) = unit.capacity.get(CAPACITY_MEMORY) {
            println!("  Memory:     {memory} per unit");
        }
    }
    println!();

    for (numa, units) in catalog.by_numa_node() {
        println!("  NUMA {numa} ({} units)", units.len());
        for chunk in units.chunks(8) {
            println!("    {}", chunk.join(" "));
        }
    }

    Ok(())
}
