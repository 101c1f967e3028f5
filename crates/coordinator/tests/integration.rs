// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: a producer publishing into a real shared-memory
//! directory and a diagnostics socket, observed through the coordinator.

use coordinator::{CoordinatorConfig, CoordinatorEvent, UpdateCoordinator};
use diag_channel::{DiagnosticsFrame, DiagnosticsPublisher, FrameSource};
use snapshot_layout::{SnapshotRecord, SnapshotWriter, TemperatureSensor, REGION_SIZE};
use snapshot_reader::{RegionName, ShmDirectory, WritableRegion};
use std::path::Path;
use std::time::{Duration, Instant};

// ── Helpers ────────────────────────────────────────────────────

fn config_for(dir: &Path, diagnostics: bool) -> CoordinatorConfig {
    CoordinatorConfig {
        region_names: vec!["Global/Telemetry".into(), "Telemetry".into()],
        shm_dir: dir.join("shm"),
        diagnostics_socket: dir.join("diag.sock"),
        retry_interval_ms: 1,
        reconnect_backoff_ms: 50,
        connect_timeout_ms: 200,
        enable_diagnostics: diagnostics,
        ..Default::default()
    }
}

fn create_region(dir: &Path, name: &str) -> WritableRegion {
    let shm = ShmDirectory::new(dir.join("shm"));
    let name: RegionName = name.parse().unwrap();
    let mut region = shm.create(&name, REGION_SIZE).unwrap();
    SnapshotWriter::initialize(region.as_mut_slice()).unwrap();
    region
}

fn sample_record() -> SnapshotRecord {
    SnapshotRecord {
        cpu_logical_cores: 8,
        cpu_usage_tenths: 231,
        memory_total_mb: 16_000,
        memory_used_mb: 6_500,
        temperature_sensors: vec![
            TemperatureSensor::new("CPU Package", 45.2),
            TemperatureSensor::new("GPU Core", 60.1),
        ],
        ..Default::default()
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[test]
fn test_coordinator_reads_published_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let mut region = create_region(dir.path(), "Telemetry");
    let mut writer = SnapshotWriter::new();
    writer.publish(region.as_mut_slice(), &sample_record()).unwrap();

    let mut c = UpdateCoordinator::new(config_for(dir.path(), false)).unwrap();
    c.start().unwrap();
    let snap = c.current_data().unwrap();
    assert_eq!(snap.cpu_temperature_c, Some(45.2));
    assert_eq!(snap.gpu_temperature_c, Some(60.1));
    assert_eq!(snap.snapshot_version(), 1);
    let label = c.status().region.unwrap();
    assert!(label.contains("Telemetry"), "{label}");

    let mut next = sample_record();
    next.memory_used_mb = 7_000;
    writer.publish(region.as_mut_slice(), &next).unwrap();
    assert!(c.poll());
    let snap = c.current_data().unwrap();
    assert_eq!(snap.record.memory_used_mb, 7_000);
    assert_eq!(snap.snapshot_version(), 2);
}

#[test]
fn test_reconnect_after_producer_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut region = create_region(dir.path(), "Global/Telemetry");
    SnapshotWriter::new()
        .publish(region.as_mut_slice(), &sample_record())
        .unwrap();

    let mut c = UpdateCoordinator::new(config_for(dir.path(), false)).unwrap();
    let events = c.subscribe();
    c.start().unwrap();
    assert!(c.is_connected());

    // Producer dies mid-write, then restarts with a fresh region.
    SnapshotWriter::begin_write(region.as_mut_slice()).unwrap();
    for _ in 0..5 {
        assert!(!c.poll());
    }
    assert!(!c.is_connected());
    region.remove().unwrap();

    let mut region = create_region(dir.path(), "Global/Telemetry");
    SnapshotWriter::new()
        .publish(region.as_mut_slice(), &sample_record())
        .unwrap();
    assert!(c.try_reconnect());
    assert!(c.is_connected());

    let flips: Vec<bool> = events
        .try_iter()
        .filter_map(|e| match e {
            CoordinatorEvent::ConnectionChanged { connected, .. } => Some(connected),
            _ => None,
        })
        .collect();
    assert_eq!(flips, vec![true, false, true]);
}

#[test]
fn test_diagnostics_logs_reach_coordinator() {
    let dir = tempfile::tempdir().unwrap();
    let mut region = create_region(dir.path(), "Telemetry");
    SnapshotWriter::new()
        .publish(region.as_mut_slice(), &sample_record())
        .unwrap();

    let source: Box<FrameSource> = Box::new(|| DiagnosticsFrame {
        write_sequence: 2,
        ..Default::default()
    });
    let publisher =
        DiagnosticsPublisher::start(dir.path().join("diag.sock"), Duration::from_millis(20), source)
            .unwrap();
    publisher.append_log("boot ok");

    let mut c = UpdateCoordinator::new(config_for(dir.path(), true)).unwrap();
    c.start().unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while !c.recent_logs().iter().any(|l| l == "boot ok") {
        assert!(Instant::now() < deadline, "log line never arrived");
        std::thread::sleep(Duration::from_millis(20));
    }
    assert!(c.layout_mismatches().is_empty());
    c.stop();
    assert!(!c.is_running());
}

#[tokio::test]
async fn test_poll_loop_on_tokio_interval() {
    let dir = tempfile::tempdir().unwrap();
    let mut region = create_region(dir.path(), "Telemetry");
    let mut writer = SnapshotWriter::new();
    writer.publish(region.as_mut_slice(), &sample_record()).unwrap();

    let mut c = UpdateCoordinator::new(config_for(dir.path(), false)).unwrap();
    c.start().unwrap();

    let mut ticker = tokio::time::interval(Duration::from_millis(5));
    for i in 0..10u64 {
        ticker.tick().await;
        let mut rec = sample_record();
        rec.memory_used_mb = 1_000 + i;
        writer.publish(region.as_mut_slice(), &rec).unwrap();
        assert!(c.poll());
    }
    assert_eq!(c.current_data().unwrap().record.memory_used_mb, 1_009);
    assert_eq!(c.status().read_stats.unwrap().successful_reads, 11);
}
