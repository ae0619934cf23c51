// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared setup.

pub mod inventory;
pub mod prepare;
pub mod reconcile;
pub mod status;
pub mod unprepare;

use device_state::{DeviceState, DriverConfig};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Reads the config file if one was given, otherwise the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<DriverConfig> {
    let config = match path {
        Some(path) => DriverConfig::from_file(path).map_err(|e| {
            anyhow::anyhow!("failed to load config from '{}': {e}", path.display())
        })?,
        None => DriverConfig::default(),
    };
    tracing::debug!(
        "driver '{}' on node '{}', CDI root {}",
        config.driver_name,
        config.node_name,
        config.cdi_root.display()
    );
    config.validate()?;
    Ok(config)
}

/// Runs the full startup sequence (common spec, checkpoint creation,
/// reconcile) on the blocking pool.
pub async fn open_state(config: &DriverConfig) -> anyhow::Result<DeviceState> {
    let config = config.clone();
    let state = tokio::task::spawn_blocking(move || DeviceState::open(&config)).await??;
    Ok(state)
}

/// Attaches to an initialized node without any startup writes, so the CLI
/// can run next to the plugin.
pub async fn attach_state(config: &DriverConfig) -> anyhow::Result<DeviceState> {
    let config = config.clone();
    let state =
        tokio::task::spawn_blocking(move || DeviceState::open_attached(&config)).await??;
    Ok(state)
}
