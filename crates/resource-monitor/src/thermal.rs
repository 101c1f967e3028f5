// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Temperature sensors from `/sys/class/thermal/`.
//!
//! Every `thermal_zone*` directory becomes one sensor named after its
//! `type` file. The kernel reports `temp` in millidegrees Celsius. A zone
//! whose temperature has reached one of its `hot` or `critical` trip points
//! is flagged urgent.

use crate::MonitorError;
use snapshot_layout::layout::MAX_TEMP_SENSORS;
use snapshot_layout::{SensorFlags, TemperatureSensor, UNAVAILABLE};
use std::path::Path;

/// Reads every thermal zone under `class_dir`, sorted by zone index.
///
/// Zones whose temperature cannot be read are reported with the sentinel
/// value and without the valid flag. At most [`MAX_TEMP_SENSORS`] zones
/// are returned.
pub fn read_zones(class_dir: &Path) -> Result<Vec<TemperatureSensor>, MonitorError> {
    let entries = std::fs::read_dir(class_dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => MonitorError::NotAvailable {
            path: class_dir.display().to_string(),
        },
        _ => MonitorError::ReadError {
            path: class_dir.display().to_string(),
            source: e,
        },
    })?;

    let mut zones: Vec<(u32, std::path::PathBuf)> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name();
            let index = name.to_str()?.strip_prefix("thermal_zone")?.parse().ok()?;
            Some((index, e.path()))
        })
        .collect();
    zones.sort_by_key(|(index, _)| *index);

    if zones.len() > MAX_TEMP_SENSORS {
        tracing::debug!(
            "thermal: {} zones, keeping the first {MAX_TEMP_SENSORS}",
            zones.len()
        );
    }
    Ok(zones
        .into_iter()
        .take(MAX_TEMP_SENSORS)
        .map(|(index, dir)| read_zone(index, &dir))
        .collect())
}

fn read_zone(index: u32, dir: &Path) -> TemperatureSensor {
    let name = read_sysfs_file(&dir.join("type")).unwrap_or_else(|_| format!("zone{index}"));
    match read_millidegrees(&dir.join("temp")) {
        Ok(milli) => {
            let mut sensor = TemperatureSensor {
                name,
                value_tenths_c: (milli as f64 / 100.0).round() as i32,
                flags: SensorFlags::VALID,
            };
            if urgent_trip_reached(dir, milli) {
                sensor.flags |= SensorFlags::URGENT;
            }
            sensor
        }
        Err(e) => {
            tracing::debug!("thermal: {name}: {e}");
            TemperatureSensor {
                name,
                value_tenths_c: i32::from(UNAVAILABLE),
                flags: SensorFlags::empty(),
            }
        }
    }
}

fn read_millidegrees(path: &Path) -> Result<i64, MonitorError> {
    let content = read_sysfs_file(path)?;
    content.parse::<i64>().map_err(|_| MonitorError::ParseError {
        path: path.display().to_string(),
        detail: format!("expected integer millidegrees, got '{content}'"),
    })
}

/// Whether `milli` has reached any `hot` or `critical` trip point of the zone.
fn urgent_trip_reached(dir: &Path, milli: i64) -> bool {
    (0..16)
        .map_while(|i| {
            let kind = read_sysfs_file(&dir.join(format!("trip_point_{i}_type"))).ok()?;
            let temp = read_millidegrees(&dir.join(format!("trip_point_{i}_temp"))).ok();
            Some((kind, temp))
        })
        .any(|(kind, temp)| {
            matches!(kind.as_str(), "hot" | "critical") && temp.is_some_and(|t| t > 0 && milli >= t)
        })
}

/// Reads a sysfs/procfs file and returns its trimmed content.
pub(crate) fn read_sysfs_file(path: &Path) -> Result<String, MonitorError> {
    if !path.exists() {
        return Err(MonitorError::NotAvailable {
            path: path.display().to_string(),
        });
    }
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| MonitorError::ReadError {
            path: path.display().to_string(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(root: &Path, index: u32, kind: &str, temp: &str) -> std::path::PathBuf {
        let dir = root.join(format!("thermal_zone{index}"));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("type"), format!("{kind}\n")).unwrap();
        std::fs::write(dir.join("temp"), format!("{temp}\n")).unwrap();
        dir
    }

    #[test]
    fn test_reads_zones_in_index_order() {
        let dir = tempfile::tempdir().unwrap();
        zone(dir.path(), 10, "iwlwifi_1", "41000");
        zone(dir.path(), 0, "x86_pkg_temp", "54321");
        zone(dir.path(), 2, "acpitz", "27800");
        std::fs::create_dir_all(dir.path().join("cooling_device0")).unwrap();

        let sensors = read_zones(dir.path()).unwrap();
        let names: Vec<&str> = sensors.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["x86_pkg_temp", "acpitz", "iwlwifi_1"]);
        assert_eq!(sensors[0].value_tenths_c, 543);
        assert_eq!(sensors[1].value_tenths_c, 278);
        assert!(sensors.iter().all(|s| s.flags.contains(SensorFlags::VALID)));
    }

    #[test]
    fn test_unreadable_temp_is_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        zone(dir.path(), 0, "gpu_thermal", "not_a_number");
        let sensors = read_zones(dir.path()).unwrap();
        assert_eq!(sensors[0].value_tenths_c, -1);
        assert!(sensors[0].flags.is_empty());
        assert_eq!(sensors[0].celsius(), None);
    }

    #[test]
    fn test_critical_trip_sets_urgent() {
        let dir = tempfile::tempdir().unwrap();
        let z = zone(dir.path(), 0, "cpu_thermal", "96000");
        std::fs::write(z.join("trip_point_0_type"), "passive\n").unwrap();
        std::fs::write(z.join("trip_point_0_temp"), "80000\n").unwrap();
        std::fs::write(z.join("trip_point_1_type"), "critical\n").unwrap();
        std::fs::write(z.join("trip_point_1_temp"), "95000\n").unwrap();
        let z2 = zone(dir.path(), 1, "soc", "60000");
        std::fs::write(z2.join("trip_point_0_type"), "critical\n").unwrap();
        std::fs::write(z2.join("trip_point_0_temp"), "95000\n").unwrap();

        let sensors = read_zones(dir.path()).unwrap();
        assert!(sensors[0].flags.contains(SensorFlags::URGENT));
        assert!(!sensors[1].flags.contains(SensorFlags::URGENT));
    }

    #[test]
    fn test_zone_count_capped() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..40 {
            zone(dir.path(), i, "z", "1000");
        }
        assert_eq!(read_zones(dir.path()).unwrap().len(), MAX_TEMP_SENSORS);
    }

    #[test]
    fn test_missing_class_dir() {
        let result = read_zones(Path::new("/nonexistent/thermal"));
        assert!(matches!(result, Err(MonitorError::NotAvailable { .. })));
    }
}
