// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `cpu-dra prepare` command: bind allocated claims and print the result.

use device_state::{Claim, Driver, DriverConfig};
use std::path::PathBuf;
use std::sync::Arc;

pub async fn execute(config: &DriverConfig, claim_files: Vec<PathBuf>) -> anyhow::Result<()> {
    let claims = claim_files
        .iter()
        .map(|path| Claim::from_file(path))
        .collect::<Result<Vec<_>, _>>()?;

    let driver = Driver::new(Arc::new(super::attach_state(config).await?));
    let results = driver.node_prepare_resources(claims).await;

    println!("{}", serde_json::to_string_pretty(&results)?);

    let failed = results.values().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} claims failed to prepare", results.len());
    }
    Ok(())
}
