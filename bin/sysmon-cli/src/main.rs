// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # sysmon
//!
//! Command-line consumer (and demo producer) for the telemetry snapshot link.
//!
//! ## Usage
//! ```bash
//! # One-shot snapshot, human readable or JSON
//! sysmon status
//! sysmon status --json
//!
//! # Poll continuously, reporting connection changes and diagnostic logs
//! sysmon watch --interval-ms 500
//!
//! # Dump raw diagnostics frames
//! sysmon diag --count 10
//!
//! # Run the demo producer: sample /proc and /sys and publish
//! sysmon publish --name SystemMonitorSharedMemory
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sysmon",
    about = "Cross-process telemetry snapshot consumer and demo producer",
    version,
    author
)]
struct Cli {
    /// Path to a TOML coordinator configuration file.
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
    /// Read one snapshot and print it.
    Status {
        /// Print the snapshot as JSON instead of the dashboard.
        #[arg(long)]
        json: bool,
    },

    /// Poll the producer periodically and report changes.
    Watch {
        /// Poll interval in milliseconds (defaults to the config value).
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Stop after this many polls.
        #[arg(long)]
        count: Option<u64>,
    },

    /// Stream raw diagnostics frames from the side-channel.
    Diag {
        /// Stop after this many frames.
        #[arg(long)]
        count: Option<u64>,
    },

    /// Sample this host and publish snapshots (demo producer).
    Publish {
        /// Region name to create, e.g. "Global/SystemMonitorSharedMemory".
        #[arg(short, long, default_value = snapshot_reader::DEFAULT_REGION_NAME)]
        name: String,

        /// Publish interval in milliseconds.
        #[arg(short, long, default_value_t = 1000)]
        interval_ms: u64,

        /// Stop after this many publishes.
        #[arg(long)]
        count: Option<u64>,

        /// Stamp each snapshot with a SHA-256 integrity hash.
        #[arg(long)]
        hash: bool,

        /// Do not serve the diagnostics side-channel.
        #[arg(long)]
        no_diagnostics: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Status { json } => commands::status::execute(config, json).await,
        Commands::Watch { interval_ms, count } => {
            commands::watch::execute(config, interval_ms, count).await
        }
        Commands::Diag { count } => commands::diag::execute(config, count).await,
        Commands::Publish {
            name,
            interval_ms,
            count,
            hash,
            no_diagnostics,
        } => {
            commands::publish::execute(config, name, interval_ms, count, hash, !no_diagnostics)
                .await
        }
    }
}
