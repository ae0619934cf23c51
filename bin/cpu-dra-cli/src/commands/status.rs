// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `cpu-dra status` command: show prepared claims and published specs.
//!
//! Read-only: claim specs without a checkpoint entry are listed, not
//! removed. `cpu-dra reconcile` repairs them.

use cdi_publisher::{CdiHandler, DescriptorPublisher};
use device_state::DriverConfig;

pub async fn execute(config: &DriverConfig) -> anyhow::Result<()> {
    let state = super::attach_state(config).await?;
    let claims = state.prepared_claims()?;

    println!("  Driver:      {}", state.driver_name());
    println!("  CDI root:    {}", config.cdi_root.display());
    println!("  Checkpoint:  {}", config.checkpoint_path().display());
    println!();

    println!("  Prepared claims ({})", claims.len());
    if claims.is_empty() {
        println!("    none");
    }
    for (uid, prepared) in &claims {
        println!("    {uid}: {}", prepared.device_names().join(", "));
        for env in &prepared.container_edits.env {
            println!("      env {env}");
        }
    }
    println!();

    let handler = CdiHandler::new(&config.cdi_root, &config.driver_name, &config.node_name)?;
    let published = handler.published_claims()?;
    println!("  Published claim specs ({})", published.len());
    for uid in &published {
        println!("    {}", handler.spec_path(uid).display());
    }

    let orphans: Vec<&String> = published.iter().filter(|uid| !claims.contains_key(*uid)).collect();
    if !orphans.is_empty() {
        println!();
        println!("  Specs without a checkpoint entry ({})", orphans.len());
        for uid in orphans {
            println!("    {uid}");
        }
    }
    Ok(())
}
