// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared console helpers.

pub mod diag;
pub mod publish;
pub mod status;
pub mod watch;

use coordinator::CoordinatorConfig;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbosity: u8) {
    let level = match verbosity {
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

/// Loads the coordinator configuration, or the defaults without a file.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<CoordinatorConfig> {
    match path {
        Some(p) => {
            let config = CoordinatorConfig::from_file(p)?;
            tracing::info!("loaded configuration from {}", p.display());
            Ok(config)
        }
        None => Ok(CoordinatorConfig::default()),
    }
}

/// Prints the boxed command header.
pub fn banner(title: &str) {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║ {:^52} ║", format!("sysmon · {title}"));
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
}

/// Creates a visual temperature bar (0-100 C scale).
pub fn temp_bar(celsius: f64) -> String {
    let filled = ((celsius / 100.0) * 20.0).round().max(0.0) as usize;
    bar(filled, if celsius >= 80.0 {
        "#"
    } else if celsius >= 60.0 {
        "="
    } else {
        "-"
    })
}

/// Creates a visual usage bar (0.0-1.0 scale).
pub fn usage_bar(ratio: f64) -> String {
    let filled = (ratio * 20.0).round().max(0.0) as usize;
    bar(filled, if ratio >= 0.9 {
        "#"
    } else if ratio >= 0.7 {
        "="
    } else {
        "-"
    })
}

fn bar(filled: usize, symbol: &str) -> String {
    let filled = filled.min(20);
    format!("[{}{}]", symbol.repeat(filled), ".".repeat(20 - filled))
}
