// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Typed snapshot handed to consumers.
//!
//! A [`SystemSnapshot`] wraps the decoded [`SnapshotRecord`] and adds the
//! convenience CPU/GPU temperatures derived from sensor names.

use snapshot_layout::{SnapshotRecord, TemperatureSensor};
use std::time::{SystemTime, UNIX_EPOCH};

/// Category a sensor name falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SensorClass {
    Cpu,
    Gpu,
}

/// Classifies a sensor by case-insensitive substring match.
///
/// GPU keywords are checked first so that names such as
/// `"GPU CPU-side diode"` count as GPU.
pub fn classify_sensor(name: &str) -> Option<SensorClass> {
    let lower = name.to_lowercase();
    if lower.contains("gpu") || lower.contains("graphics") {
        Some(SensorClass::Gpu)
    } else if lower.contains("cpu") || lower.contains("package") {
        Some(SensorClass::Cpu)
    } else {
        None
    }
}

/// An owned, validated snapshot of the producer's telemetry.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SystemSnapshot {
    #[serde(flatten)]
    pub record: SnapshotRecord,
    /// First CPU-classified sensor reading, in °C.
    pub cpu_temperature_c: Option<f32>,
    /// First GPU-classified sensor reading, in °C.
    pub gpu_temperature_c: Option<f32>,
    /// Local wall-clock time the snapshot was copied out, in Unix ms.
    pub captured_at_ms: u64,
}

impl SystemSnapshot {
    /// Derives the convenience fields from a decoded record.
    pub fn from_record(record: SnapshotRecord) -> Self {
        let (cpu_temperature_c, gpu_temperature_c) = first_temperatures(&record.temperature_sensors);
        let captured_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            record,
            cpu_temperature_c,
            gpu_temperature_c,
            captured_at_ms,
        }
    }

    pub fn write_sequence(&self) -> u32 {
        self.record.write_sequence
    }

    pub fn snapshot_version(&self) -> u32 {
        self.record.snapshot_version
    }

    /// Returns a one-line summary suitable for logging or CLI display.
    ///
    /// # Example output
    /// ```text
    /// Snapshot v7 (seq 42): CPU 8 cores 23.1%, Mem 6500/16000 MB (41% used), CPU 61.5°C, GPU 48.0°C, 2 sensors, 1 disks, 1 usb
    /// ```
    pub fn summary(&self) -> String {
        let r = &self.record;
        let usage = r
            .cpu_usage_percent()
            .map(|p| format!("{p:.1}%"))
            .unwrap_or_else(|| "n/a".to_string());
        let temp = |t: Option<f32>| {
            t.map(|c| format!("{c:.1}°C"))
                .unwrap_or_else(|| "n/a".to_string())
        };
        format!(
            "Snapshot v{} (seq {}): CPU {} cores {usage}, Mem {}/{} MB ({:.0}% used), \
             CPU {}, GPU {}, {} sensors, {} disks, {} usb",
            r.snapshot_version,
            r.write_sequence,
            r.cpu_logical_cores,
            r.memory_used_mb,
            r.memory_total_mb,
            r.memory_utilisation() * 100.0,
            temp(self.cpu_temperature_c),
            temp(self.gpu_temperature_c),
            r.temperature_sensors.len(),
            r.smart_disks.len(),
            r.usb_devices.len(),
        )
    }
}

/// First CPU and first GPU reading; sensors reporting the unavailable
/// sentinel are skipped.
fn first_temperatures(sensors: &[TemperatureSensor]) -> (Option<f32>, Option<f32>) {
    let mut cpu = None;
    let mut gpu = None;
    for sensor in sensors {
        let Some(celsius) = sensor.celsius() else {
            continue;
        };
        match classify_sensor(&sensor.name) {
            Some(SensorClass::Cpu) if cpu.is_none() => cpu = Some(celsius),
            Some(SensorClass::Gpu) if gpu.is_none() => gpu = Some(celsius),
            _ => {}
        }
        if cpu.is_some() && gpu.is_some() {
            break;
        }
    }
    (cpu, gpu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapshot_layout::SensorFlags;

    fn sensor(name: &str, tenths: i32) -> TemperatureSensor {
        TemperatureSensor {
            name: name.into(),
            value_tenths_c: tenths,
            flags: SensorFlags::VALID,
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify_sensor("CPU Package"), Some(SensorClass::Cpu));
        assert_eq!(classify_sensor("package id 0"), Some(SensorClass::Cpu));
        assert_eq!(classify_sensor("GPU Core"), Some(SensorClass::Gpu));
        assert_eq!(classify_sensor("Intel Graphics"), Some(SensorClass::Gpu));
        assert_eq!(classify_sensor("NVMe Composite"), None);
    }

    #[test]
    fn test_first_match_wins() {
        let record = SnapshotRecord {
            temperature_sensors: vec![
                sensor("CPU Package", 452),
                sensor("CPU Core #1", 700),
                sensor("GPU Core", 601),
                sensor("GPU Hotspot", 800),
            ],
            ..Default::default()
        };
        let snap = SystemSnapshot::from_record(record);
        assert_eq!(snap.cpu_temperature_c, Some(45.2));
        assert_eq!(snap.gpu_temperature_c, Some(60.1));
    }

    #[test]
    fn test_unavailable_sensor_skipped() {
        let record = SnapshotRecord {
            temperature_sensors: vec![sensor("CPU Package", -1), sensor("cpu die", 500)],
            ..Default::default()
        };
        let snap = SystemSnapshot::from_record(record);
        assert_eq!(snap.cpu_temperature_c, Some(50.0));
        assert_eq!(snap.gpu_temperature_c, None);
    }

    #[test]
    fn test_summary_format() {
        let record = SnapshotRecord {
            snapshot_version: 7,
            write_sequence: 42,
            cpu_logical_cores: 8,
            cpu_usage_tenths: 231,
            memory_total_mb: 16000,
            memory_used_mb: 6500,
            temperature_sensors: vec![sensor("CPU Package", 615)],
            ..Default::default()
        };
        let summary = SystemSnapshot::from_record(record).summary();
        assert!(summary.contains("v7"));
        assert!(summary.contains("8 cores 23.1%"));
        assert!(summary.contains("CPU 61.5°C"));
        assert!(summary.contains("GPU n/a"));
    }
}
