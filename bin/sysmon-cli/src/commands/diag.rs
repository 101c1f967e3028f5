// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `sysmon diag` command: print raw diagnostics frames.

use super::banner;
use coordinator::CoordinatorConfig;
use diag_channel::{ChannelClient, ChannelEvent, ChannelState};
use std::time::Duration;

pub async fn execute(config: CoordinatorConfig, count: Option<u64>) -> anyhow::Result<()> {
    banner("Diagnostics");
    let client_config = config.client_config();
    println!("  Endpoint: {}", client_config.endpoint.display());
    println!();

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut client = ChannelClient::new(client_config);
    client.start(tx)?;

    let mut frames = 0u64;
    'outer: loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("  Interrupted.");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(50)) => {}
        }

        for event in rx.try_iter() {
            match event {
                ChannelEvent::Frame(frame) => {
                    frames += 1;
                    println!(
                        "  #{frames:<5} t={} seq={} abi={:#010x} version={}",
                        frame.timestamp,
                        frame.write_sequence,
                        frame.abi_version,
                        frame.snapshot_version
                    );
                    for (name, local, remote) in frame.layout_mismatches() {
                        println!("         [ABI ] {name}: producer {remote}, local {local}");
                    }
                    for line in &frame.logs {
                        println!("         [LOG ] {line}");
                    }
                    if count.is_some_and(|n| frames >= n) {
                        break 'outer;
                    }
                }
                ChannelEvent::StateChanged(state) => {
                    let label = match state {
                        ChannelState::Disconnected => "disconnected",
                        ChannelState::Connecting => "connecting",
                        ChannelState::Streaming => "streaming",
                    };
                    println!("  [{label}]");
                }
                ChannelEvent::Error(e) => println!("  [ERR ] {e}"),
            }
        }
    }

    client.stop();
    println!();
    println!("  {frames} frame(s) received.");
    Ok(())
}
