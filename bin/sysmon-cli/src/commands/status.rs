// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `sysmon status` command: connect, read one snapshot, print it.

use super::{banner, temp_bar, usage_bar};
use coordinator::{CoordinatorConfig, UpdateCoordinator};
use snapshot_layout::StatusFlags;
use snapshot_reader::SystemSnapshot;

pub async fn execute(mut config: CoordinatorConfig, json: bool) -> anyhow::Result<()> {
    config.enable_diagnostics = false;
    let mut coordinator = UpdateCoordinator::new(config)?;
    if let Err(e) = coordinator.start() {
        if e.is_abi_mismatch() {
            anyhow::bail!("producer is incompatible with this build: {e}");
        }
        anyhow::bail!("producer not reachable: {e}");
    }

    let snapshot = coordinator
        .current_data()
        .ok_or_else(|| anyhow::anyhow!("no snapshot: {}", coordinator.connection_status()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    banner("Telemetry Snapshot");
    if let Some(region) = coordinator.status().region {
        println!("  Region:       {region}");
    }
    print_snapshot(&snapshot);
    println!("{}", snapshot.summary());
    Ok(())
}

/// Prints the dashboard sections for one snapshot.
pub fn print_snapshot(snapshot: &SystemSnapshot) {
    let r = &snapshot.record;
    println!(
        "  Sequence:     {} (snapshot v{})",
        r.write_sequence, r.snapshot_version
    );
    if !r.status.is_empty() {
        let mut flags = Vec::new();
        if r.status.contains(StatusFlags::DEGRADE_MODE) {
            flags.push("degraded");
        }
        if r.status.contains(StatusFlags::HASH_MISMATCH) {
            flags.push("hash mismatch");
        }
        if r.status.contains(StatusFlags::SEQUENCE_STALL_WARN) {
            flags.push("sequence stall");
        }
        println!("  Producer:     {}", flags.join(", "));
    }
    println!();

    // ── CPU ────────────────────────────────────────────────────
    println!("  CPU");
    println!("   Logical cores: {}", r.cpu_logical_cores);
    match r.cpu_usage_percent() {
        Some(pct) => println!(
            "   Usage:         {pct:.1}%  {}",
            usage_bar(f64::from(pct) / 100.0)
        ),
        None => println!("   Usage:         n/a"),
    }
    println!();

    // ── Memory ─────────────────────────────────────────────────
    println!("  Memory");
    let ratio = r.memory_utilisation();
    println!("   Total:         {} MB", r.memory_total_mb);
    println!(
        "   Used:          {} MB ({:.1}%)  {}",
        r.memory_used_mb,
        ratio * 100.0,
        usage_bar(ratio)
    );
    println!();

    // ── Temperatures ───────────────────────────────────────────
    println!("  Temperatures");
    for (label, value) in [
        ("CPU", snapshot.cpu_temperature_c),
        ("GPU", snapshot.gpu_temperature_c),
    ] {
        match value {
            Some(c) => println!("   {label}:           {c:.1} C  {}", temp_bar(f64::from(c))),
            None => println!("   {label}:           n/a"),
        }
    }
    for sensor in &r.temperature_sensors {
        let value = sensor
            .celsius()
            .map(|c| format!("{c:.1} C"))
            .unwrap_or_else(|| "n/a".into());
        let urgent = if sensor.flags.contains(snapshot_layout::SensorFlags::URGENT) {
            "  URGENT"
        } else {
            ""
        };
        println!("   · {:<28} {value}{urgent}", sensor.name);
    }
    println!();

    // ── Disks ──────────────────────────────────────────────────
    if !r.smart_disks.is_empty() {
        println!("  Disks (SMART)");
        for d in &r.smart_disks {
            println!(
                "   · {:<20} score {:>3}  {}h  wear {}%  realloc {} pending {} uncorr {}",
                d.disk_id,
                d.score,
                d.hours_on,
                d.wear_percent,
                d.reallocated,
                d.pending,
                d.uncorrectable
            );
        }
        println!();
    }

    // ── USB ────────────────────────────────────────────────────
    if !r.usb_devices.is_empty() {
        println!("  USB drives");
        for u in &r.usb_devices {
            let t = &u.last_update;
            println!(
                "   · {:<4} {:<20} {}/{} MB free  {:?}  updated {:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                u.drive_path,
                u.volume_label,
                u.free_space / (1024 * 1024),
                u.total_size / (1024 * 1024),
                u.state,
                t.year,
                t.month,
                t.day,
                t.hour,
                t.minute,
                t.second
            );
        }
        println!();
    }

    // ── Board ──────────────────────────────────────────────────
    let b = &r.board;
    if !b.manufacturer.is_empty() || !b.bios_vendor.is_empty() {
        println!("  Board");
        println!("   Baseboard:     {} {} {}", b.manufacturer, b.product, b.version);
        println!("   BIOS:          {} {} ({})", b.bios_vendor, b.bios_version, b.bios_date);
        println!(
            "   Secure boot:   {}   TPM: {}",
            yes_no(b.secure_boot_enabled),
            yes_no(b.tpm_present)
        );
        if b.memory_slots_total > 0 {
            println!(
                "   Memory slots:  {}/{} used",
                b.memory_slots_used, b.memory_slots_total
            );
        }
        println!();
    }
}

fn yes_no(v: bool) -> &'static str {
    if v {
        "yes"
    } else {
        "no"
    }
}
