// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # cpu-dra
//!
//! Operator CLI for the CPU resource driver's node-local state.
//!
//! ## Usage
//! ```bash
//! # Show the allocatable units grouped by NUMA node
//! cpu-dra inventory
//!
//! # Prepare a claim from its JSON description
//! cpu-dra --config /etc/cpu-dra.toml prepare --claim ./claim.json
//!
//! # Release it again
//! cpu-dra unprepare --uid 5f2c9a1e-claim
//!
//! # Inspect and repair published specs against the checkpoint
//! cpu-dra status
//! cpu-dra reconcile
//! ```
//!
//! `reconcile` runs the driver's startup sequence and must have run once
//! on a node (or the plugin must have started) before the other state
//! commands can attach to its checkpoint.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cpu-dra",
    about = "Node-local state of the CPU dynamic resource allocation driver",
    version,
    author
)]
struct Cli {
    /// Path to a TOML driver configuration file.
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the allocatable units grouped by NUMA node.
    Inventory,

    /// Prepare one or more allocated claims and print their bound devices.
    Prepare {
        /// Claim JSON file (repeat for a batch).
        #[arg(long, required = true)]
        claim: Vec<std::path::PathBuf>,
    },

    /// Unprepare one or more claims by UID.
    Unprepare {
        /// Claim UID (repeat for a batch).
        #[arg(long, required = true)]
        uid: Vec<String>,
    },

    /// Show prepared claims, published specs and counters.
    Status,

    /// Initialize the node, remove orphaned specs and restore missing ones.
    Reconcile,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Inventory => commands::inventory::execute(&config).await,
        Commands::Prepare { claim } => commands::prepare::execute(&config, claim).await,
        Commands::Unprepare { uid } => commands::unprepare::execute(&config, uid).await,
        Commands::Status => commands::status::execute(&config).await,
        Commands::Reconcile => commands::reconcile::execute(&config).await,
    }
}
