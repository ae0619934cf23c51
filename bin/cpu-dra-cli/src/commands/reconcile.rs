// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `cpu-dra reconcile` command: repair specs against the checkpoint.

use device_state::DriverConfig;
use std::sync::Arc;

pub async fn execute(config: &DriverConfig) -> anyhow::Result<()> {
    let state = Arc::new(super::open_state(config).await?);

    let worker = Arc::clone(&state);
    let report = tokio::task::spawn_blocking(move || worker.reconcile()).await??;

    // Startup already reconciled once; report both passes.
    let stats = state.stats();
    println!(
        "  Startup:   removed {}, restored {}",
        stats.orphans_removed - report.removed.len() as u64,
        stats.descriptors_restored - report.restored.len() as u64,
    );
    println!("  This pass: {}", report.summary());
    for uid in &report.removed {
        println!("    removed  {uid}");
    }
    for uid in &report.restored {
        println!("    restored {uid}");
    }
    Ok(())
}
