// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `sysmon watch` command: drive the coordinator from a tokio interval.
//!
//! Prints one line per new snapshot, connection status transitions and
//! diagnostic log lines as they arrive. While disconnected, every tick
//! attempts a reconnect. A size or ABI mismatch with the producer ends the
//! watch, whether it shows up at startup or later.

use super::banner;
use coordinator::{CoordinatorConfig, CoordinatorEvent, UpdateCoordinator};
use std::time::Duration;

/// Ticks between explicit log ring cleanups.
const CLEANUP_EVERY: u64 = 60;

pub async fn execute(
    config: CoordinatorConfig,
    interval_ms: Option<u64>,
    count: Option<u64>,
) -> anyhow::Result<()> {
    banner("Watch");
    let interval = interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.poll_interval());
    println!("  Polling every {} ms. Ctrl-C to stop.", interval.as_millis());
    println!();

    let mut coordinator = UpdateCoordinator::new(config)?;
    let events = coordinator.subscribe();
    let mut ticker = tokio::time::interval(interval);
    let mut last_version = None;
    let mut log_cursor = 0u64;
    let mut ticks = 0u64;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("  Interrupted.");
                break;
            }
            _ = ticker.tick() => {}
        }

        if !coordinator.is_running() {
            match coordinator.start() {
                Ok(()) => {}
                Err(e) if e.is_abi_mismatch() => return Err(e.into()),
                Err(e) => tracing::info!("waiting for producer: {e}"),
            }
        } else if !coordinator.poll() && !coordinator.is_connected() {
            coordinator.try_reconnect();
        }

        for event in events.try_iter() {
            match event {
                CoordinatorEvent::ConnectionChanged { connected, reason } => {
                    let tag = if connected { "UP  " } else { "DOWN" };
                    println!("  [{tag}] {reason}");
                }
                CoordinatorEvent::LayoutMismatch(diff) => {
                    for (name, local, remote) in diff {
                        println!("  [ABI ] {name}: producer {remote}, local {local}");
                    }
                }
                CoordinatorEvent::Incompatible(reason) => println!("  [ABI ] {reason}"),
                CoordinatorEvent::DataUpdated { .. } | CoordinatorEvent::Error(_) => {}
            }
        }

        if let Some(reason) = coordinator.incompatibility() {
            coordinator.stop();
            anyhow::bail!("producer is incompatible with this build: {reason}");
        }

        if let Some(snapshot) = coordinator.current_data() {
            if last_version != Some(snapshot.write_sequence()) {
                last_version = Some(snapshot.write_sequence());
                println!("  {}", snapshot.summary());
            }
        }

        let (lines, cursor) = coordinator.logs_since(log_cursor);
        for line in lines {
            println!("  [LOG ] {line}");
        }
        log_cursor = cursor;

        ticks += 1;
        if ticks % CLEANUP_EVERY == 0 {
            coordinator.cleanup_logs();
        }
        if count.is_some_and(|n| ticks >= n) {
            break;
        }
    }

    println!();
    print!("{}", coordinator.diagnostic_info());
    coordinator.stop();
    Ok(())
}
