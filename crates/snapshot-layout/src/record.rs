// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Owned, typed form of one snapshot.
//!
//! A [`SnapshotRecord`] holds no reference into the shared region: it is
//! produced by [`decode`](crate::decode) from a private copy and consumed
//! by [`encode`](crate::encode) / [`SnapshotWriter`](crate::SnapshotWriter).

use crate::layout::{ABI_VERSION, INTEGRITY_HASH_LEN};

/// Sentinel stored in `i16` value fields when a reading is unavailable.
pub const UNAVAILABLE: i16 = -1;

bitflags::bitflags! {
    /// Per-sensor flag byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
    pub struct SensorFlags: u8 {
        /// The reading was taken successfully.
        const VALID = 1;
        /// The last reading crossed the sensor's urgent threshold.
        const URGENT = 1 << 1;
    }
}

bitflags::bitflags! {
    /// Producer status bits carried in byte 0 of the reserved block.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
    pub struct StatusFlags: u8 {
        /// The producer is running with reduced probes.
        const DEGRADE_MODE = 1;
        /// The producer detected an integrity hash mismatch.
        const HASH_MISMATCH = 1 << 1;
        /// The write sequence has not advanced for longer than expected.
        const SEQUENCE_STALL_WARN = 1 << 2;
    }
}

/// One temperature sensor slot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TemperatureSensor {
    pub name: String,
    /// Tenths of a degree Celsius; `-1` when unavailable.
    pub value_tenths_c: i32,
    pub flags: SensorFlags,
}

impl TemperatureSensor {
    pub fn new(name: impl Into<String>, celsius: f32) -> Self {
        Self {
            name: name.into(),
            value_tenths_c: (celsius * 10.0).round() as i32,
            flags: SensorFlags::VALID,
        }
    }

    /// Returns the reading in degrees Celsius, or `None` for the sentinel.
    pub fn celsius(&self) -> Option<f32> {
        if self.value_tenths_c == UNAVAILABLE as i32 {
            None
        } else {
            Some(self.value_tenths_c as f32 / 10.0)
        }
    }
}

/// SMART health summary for one physical disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct SmartDiskScore {
    pub disk_id: String,
    /// 0-100, `-1` when unavailable.
    pub score: i16,
    pub hours_on: i32,
    /// 0-100, `-1` when unavailable.
    pub wear_percent: i16,
    pub reallocated: u16,
    pub pending: u16,
    pub uncorrectable: u16,
    /// `-1` when unavailable.
    pub temperature_c: i16,
    pub recent_growth_flags: u8,
}

/// Lifecycle state of a removable drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum UsbState {
    Removed,
    Inserted,
    UpdateReady,
    Unknown(u8),
}

impl From<u8> for UsbState {
    fn from(raw: u8) -> Self {
        match raw {
            0 => UsbState::Removed,
            1 => UsbState::Inserted,
            2 => UsbState::UpdateReady,
            other => UsbState::Unknown(other),
        }
    }
}

impl From<UsbState> for u8 {
    fn from(state: UsbState) -> Self {
        match state {
            UsbState::Removed => 0,
            UsbState::Inserted => 1,
            UsbState::UpdateReady => 2,
            UsbState::Unknown(raw) => raw,
        }
    }
}

/// Calendar timestamp in the producer's `SYSTEMTIME` shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct UpdateTime {
    pub year: u16,
    pub month: u16,
    pub day_of_week: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    pub milliseconds: u16,
}

impl UpdateTime {
    pub(crate) fn to_words(self) -> [u16; 8] {
        [
            self.year,
            self.month,
            self.day_of_week,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.milliseconds,
        ]
    }

    pub(crate) fn from_words(w: [u16; 8]) -> Self {
        Self {
            year: w[0],
            month: w[1],
            day_of_week: w[2],
            day: w[3],
            hour: w[4],
            minute: w[5],
            second: w[6],
            milliseconds: w[7],
        }
    }
}

/// One removable drive slot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UsbDeviceRecord {
    pub drive_path: String,
    pub volume_label: String,
    pub total_size: u64,
    pub free_space: u64,
    pub is_update_ready: bool,
    pub state: UsbState,
    pub last_update: UpdateTime,
}

/// Baseboard, firmware and platform security information.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct BoardInfo {
    pub manufacturer: String,
    pub product: String,
    pub version: String,
    pub serial: String,
    pub bios_vendor: String,
    pub bios_version: String,
    pub bios_date: String,
    pub secure_boot_enabled: bool,
    pub tpm_present: bool,
    pub memory_slots_total: u16,
    pub memory_slots_used: u16,
}

/// A complete, owned snapshot of the shared region.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SnapshotRecord {
    pub abi_version: u32,
    pub write_sequence: u32,
    pub snapshot_version: u32,
    pub cpu_logical_cores: u16,
    /// CPU usage in tenths of a percent; `-1` when unavailable.
    pub cpu_usage_tenths: i16,
    pub memory_total_mb: u64,
    pub memory_used_mb: u64,
    pub temperature_sensors: Vec<TemperatureSensor>,
    pub smart_disks: Vec<SmartDiskScore>,
    pub board: BoardInfo,
    pub status: StatusFlags,
    #[serde(skip)]
    pub integrity_hash: [u8; INTEGRITY_HASH_LEN],
    pub usb_devices: Vec<UsbDeviceRecord>,
}

impl Default for SnapshotRecord {
    fn default() -> Self {
        Self {
            abi_version: ABI_VERSION,
            write_sequence: 0,
            snapshot_version: 0,
            cpu_logical_cores: 0,
            cpu_usage_tenths: UNAVAILABLE,
            memory_total_mb: 0,
            memory_used_mb: 0,
            temperature_sensors: Vec::new(),
            smart_disks: Vec::new(),
            board: BoardInfo::default(),
            status: StatusFlags::empty(),
            integrity_hash: [0; INTEGRITY_HASH_LEN],
            usb_devices: Vec::new(),
        }
    }
}

impl SnapshotRecord {
    /// CPU usage in percent, or `None` when the producer did not sample it.
    pub fn cpu_usage_percent(&self) -> Option<f32> {
        if self.cpu_usage_tenths == UNAVAILABLE {
            None
        } else {
            Some(self.cpu_usage_tenths as f32 / 10.0)
        }
    }

    /// Whether a refresh carrying this record counts as a data update.
    pub fn has_data(&self) -> bool {
        self.cpu_usage_tenths != UNAVAILABLE
            || self.memory_used_mb > 0
            || !self.temperature_sensors.is_empty()
    }

    /// Memory utilisation as a fraction in `[0.0, 1.0]`.
    pub fn memory_utilisation(&self) -> f64 {
        if self.memory_total_mb == 0 {
            return 0.0;
        }
        (self.memory_used_mb as f64 / self.memory_total_mb as f64).min(1.0)
    }

    /// Whether the producer published an integrity hash.
    pub fn has_integrity_hash(&self) -> bool {
        self.integrity_hash.iter().any(|&b| b != 0)
    }
}
