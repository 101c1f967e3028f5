// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `sysmon publish` command: the demo producer.
//!
//! Creates the region, samples this host on every tick, publishes through
//! the sequence protocol and, unless disabled, serves diagnostics frames
//! that echo the latest publish.

use super::banner;
use anyhow::Context;
use coordinator::CoordinatorConfig;
use diag_channel::{DiagnosticsFrame, DiagnosticsPublisher, FrameSource};
use resource_monitor::Sampler;
use snapshot_layout::{SnapshotWriter, REGION_SIZE};
use snapshot_reader::RegionName;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub async fn execute(
    config: CoordinatorConfig,
    name: String,
    interval_ms: u64,
    count: Option<u64>,
    hash: bool,
    diagnostics: bool,
) -> anyhow::Result<()> {
    banner("Publish");
    let region_name: RegionName = name
        .parse()
        .map_err(|e| anyhow::anyhow!("bad region name '{name}': {e}"))?;
    let locator = config.locator();
    let mut region = locator
        .create(&region_name, REGION_SIZE)
        .with_context(|| format!("cannot create {}", locator.path_of(&region_name).display()))?;
    SnapshotWriter::initialize(region.as_mut_slice())?;

    let interval = Duration::from_millis(interval_ms.max(1));
    println!("  Region:   {} ({})", region_name, region.path().display());
    println!("  Interval: {} ms{}", interval.as_millis(), if hash { ", hashed" } else { "" });

    let latest = Arc::new(Mutex::new(DiagnosticsFrame::default()));
    let mut publisher = if diagnostics {
        let shared = Arc::clone(&latest);
        let source: Box<FrameSource> =
            Box::new(move || shared.lock().unwrap_or_else(|e| e.into_inner()).clone());
        let publisher =
            DiagnosticsPublisher::start(config.diagnostics_socket.clone(), interval, source)?;
        println!("  Diagnostics: {}", publisher.path().display());
        Some(publisher)
    } else {
        None
    };
    println!();

    let mut writer = SnapshotWriter::new().with_integrity_hash(hash);
    let mut sampler = Sampler::new();
    let mut ticker = tokio::time::interval(interval);
    let mut published = 0u64;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("  Interrupted.");
                break;
            }
            _ = ticker.tick() => {}
        }

        let record = match sampler.sample() {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("sampling failed, skipping publish: {e}");
                continue;
            }
        };
        let seq = writer.publish(region.as_mut_slice(), &record)?;
        published += 1;

        let summary = format!(
            "published seq {seq}: cpu {} mem {}/{} MB, {} sensor(s)",
            match record.cpu_usage_tenths {
                t if t < 0 => "n/a".to_string(),
                t => format!("{:.1}%", f32::from(t) / 10.0),
            },
            record.memory_used_mb,
            record.memory_total_mb,
            record.temperature_sensors.len()
        );
        println!("  {summary}");

        {
            let mut frame = latest.lock().unwrap_or_else(|e| e.into_inner());
            frame.write_sequence = seq;
            frame.abi_version = record.abi_version;
            frame.snapshot_version = writer.snapshot_version();
            frame.cpu_logical_cores = u32::from(record.cpu_logical_cores);
            frame.memory_total_mb = record.memory_total_mb;
            frame.memory_used_mb = record.memory_used_mb;
        }
        if let Some(p) = publisher.as_ref() {
            p.append_log(summary);
        }

        if count.is_some_and(|n| published >= n) {
            break;
        }
    }

    if let Some(p) = publisher.as_mut() {
        p.stop();
    }
    region
        .remove()
        .context("cannot remove the snapshot region")?;
    println!("  {published} snapshot(s) published, region removed.");
    Ok(())
}
