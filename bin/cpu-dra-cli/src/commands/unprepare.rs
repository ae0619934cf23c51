// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `cpu-dra unprepare` command: release claims by UID.

use device_state::{Driver, DriverConfig};
use std::sync::Arc;

pub async fn execute(config: &DriverConfig, claim_uids: Vec<String>) -> anyhow::Result<()> {
    let driver = Driver::new(Arc::new(super::attach_state(config).await?));
    let results = driver.node_unprepare_resources(claim_uids).await;

    let mut failed = 0;
    for (uid, result) in &results {
        match &result.error {
            None => println!("  {uid}: unprepared"),
            Some(e) => {
                failed += 1;
                println!("  {uid}: {e}");
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} claims failed to unprepare", results.len());
    }
    Ok(())
}
