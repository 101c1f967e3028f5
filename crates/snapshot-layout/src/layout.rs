// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Byte-level layout of the shared snapshot region.
//!
//! The region is a packed (alignment 1), little-endian block of exactly
//! [`REGION_SIZE`] bytes. Offsets are derived from the field sizes and then
//! pinned to their published values at compile time, so any edit that
//! shifts a field fails the build instead of silently breaking readers.
//!
//! ```text
//!   0 ┌ header ─ abi · writeSequence · snapshotVersion · reserved
//!  16 ├ cpu cores · cpu usage ×10 · memory total/used MB
//!  36 ├ temperature sensors [32 × 35]
//! 1156├ sensor count · SMART disks [16 × 49] · disk count
//! 1943├ baseboard / BIOS strings · secure boot · TPM · memory slots
//! 2429├ status flags (futureReserved) · integrity hash
//! 2525├ USB devices [8 × 71] · device count
//! 3094├ extension pad
//! 3212└
//! ```

/// ABI version stamped into the first word of the region.
pub const ABI_VERSION: u32 = 0x0001_0014;

/// Total size of the region in bytes.
pub const REGION_SIZE: usize = 3212;

/// Maximum number of temperature sensor slots.
pub const MAX_TEMP_SENSORS: usize = 32;
/// Maximum number of SMART disk slots.
pub const MAX_SMART_DISKS: usize = 16;
/// Maximum number of USB device slots.
pub const MAX_USB_DEVICES: usize = 8;

// ── Record strides ─────────────────────────────────────────────

/// `name[32] · valueTenthsC i16 · flags u8`
pub const SENSOR_STRIDE: usize = 35;
/// `diskId[32] · score · hoursOn · wear · reallocated · pending · uncorrectable · tempC · growthFlags`
pub const SMART_DISK_STRIDE: usize = 49;
/// `drivePath[4] · volumeLabel[32] · sizes · flags · lastUpdate (SYSTEMTIME)`
pub const USB_DEVICE_STRIDE: usize = 71;

// ── Fixed string lengths ───────────────────────────────────────

pub const SENSOR_NAME_LEN: usize = 32;
pub const DISK_ID_LEN: usize = 32;
pub const DRIVE_PATH_LEN: usize = 4;
pub const VOLUME_LABEL_LEN: usize = 32;
pub const BASEBOARD_MANUFACTURER_LEN: usize = 128;
pub const BASEBOARD_FIELD_LEN: usize = 64;
pub const BIOS_DATE_LEN: usize = 32;
pub const FUTURE_RESERVED_LEN: usize = 64;
pub const INTEGRITY_HASH_LEN: usize = 32;
pub const EXTENSION_PAD_LEN: usize = 118;

/// Absolute byte offsets of every top-level field.
pub mod offsets {
    use super::*;

    pub const ABI_VERSION: usize = 0;
    pub const WRITE_SEQUENCE: usize = 4;
    pub const SNAPSHOT_VERSION: usize = 8;
    pub const RESERVED_HEADER: usize = 12;
    pub const CPU_LOGICAL_CORES: usize = 16;
    pub const CPU_USAGE_X10: usize = 18;
    pub const MEMORY_TOTAL_MB: usize = 20;
    pub const MEMORY_USED_MB: usize = 28;
    pub const TEMP_SENSORS: usize = 36;
    pub const TEMP_SENSOR_COUNT: usize = TEMP_SENSORS + MAX_TEMP_SENSORS * SENSOR_STRIDE;
    pub const SMART_DISKS: usize = TEMP_SENSOR_COUNT + 2;
    pub const SMART_DISK_COUNT: usize = SMART_DISKS + MAX_SMART_DISKS * SMART_DISK_STRIDE;
    pub const BASEBOARD_MANUFACTURER: usize = SMART_DISK_COUNT + 1;
    pub const BASEBOARD_PRODUCT: usize = BASEBOARD_MANUFACTURER + BASEBOARD_MANUFACTURER_LEN;
    pub const BASEBOARD_VERSION: usize = BASEBOARD_PRODUCT + BASEBOARD_FIELD_LEN;
    pub const BASEBOARD_SERIAL: usize = BASEBOARD_VERSION + BASEBOARD_FIELD_LEN;
    pub const BIOS_VENDOR: usize = BASEBOARD_SERIAL + BASEBOARD_FIELD_LEN;
    pub const BIOS_VERSION: usize = BIOS_VENDOR + BASEBOARD_FIELD_LEN;
    pub const BIOS_DATE: usize = BIOS_VERSION + BASEBOARD_FIELD_LEN;
    pub const SECURE_BOOT_ENABLED: usize = BIOS_DATE + BIOS_DATE_LEN;
    pub const TPM_PRESENT: usize = SECURE_BOOT_ENABLED + 1;
    pub const MEMORY_SLOTS_TOTAL: usize = TPM_PRESENT + 1;
    pub const MEMORY_SLOTS_USED: usize = MEMORY_SLOTS_TOTAL + 2;
    pub const FUTURE_RESERVED: usize = MEMORY_SLOTS_USED + 2;
    pub const INTEGRITY_HASH: usize = FUTURE_RESERVED + FUTURE_RESERVED_LEN;
    pub const USB_DEVICES: usize = INTEGRITY_HASH + INTEGRITY_HASH_LEN;
    pub const USB_DEVICE_COUNT: usize = USB_DEVICES + MAX_USB_DEVICES * USB_DEVICE_STRIDE;
    pub const EXTENSION_PAD: usize = USB_DEVICE_COUNT + 1;
}

/// Field offsets inside one temperature sensor record.
pub mod sensor {
    pub const NAME: usize = 0;
    pub const VALUE_TENTHS_C: usize = 32;
    pub const FLAGS: usize = 34;
}

/// Field offsets inside one SMART disk record.
pub mod smart {
    pub const DISK_ID: usize = 0;
    pub const SCORE: usize = 32;
    pub const HOURS_ON: usize = 34;
    pub const WEAR_PERCENT: usize = 38;
    pub const REALLOCATED: usize = 40;
    pub const PENDING: usize = 42;
    pub const UNCORRECTABLE: usize = 44;
    pub const TEMPERATURE_C: usize = 46;
    pub const RECENT_GROWTH_FLAGS: usize = 48;
}

/// Field offsets inside one USB device record.
pub mod usb {
    pub const DRIVE_PATH: usize = 0;
    pub const VOLUME_LABEL: usize = 4;
    pub const TOTAL_SIZE: usize = 36;
    pub const FREE_SPACE: usize = 44;
    pub const IS_UPDATE_READY: usize = 52;
    pub const STATE: usize = 53;
    pub const RESERVED: usize = 54;
    /// Eight little-endian `u16` words: year, month, day of week, day,
    /// hour, minute, second, milliseconds.
    pub const LAST_UPDATE: usize = 55;
    pub const LAST_UPDATE_LEN: usize = 16;
}

// ── Compile-time layout checks ─────────────────────────────────

const _: () = assert!(offsets::TEMP_SENSOR_COUNT == 1156);
const _: () = assert!(offsets::SMART_DISKS == 1158);
const _: () = assert!(offsets::SMART_DISK_COUNT == 1942);
const _: () = assert!(offsets::BASEBOARD_MANUFACTURER == 1943);
const _: () = assert!(offsets::BIOS_DATE == 2391);
const _: () = assert!(offsets::SECURE_BOOT_ENABLED == 2423);
const _: () = assert!(offsets::FUTURE_RESERVED == 2429);
const _: () = assert!(offsets::INTEGRITY_HASH == 2493);
const _: () = assert!(offsets::USB_DEVICES == 2525);
const _: () = assert!(offsets::USB_DEVICE_COUNT == 3093);
const _: () = assert!(offsets::EXTENSION_PAD == 3094);
const _: () = assert!(offsets::EXTENSION_PAD + EXTENSION_PAD_LEN == REGION_SIZE);
const _: () = assert!(sensor::FLAGS + 1 == SENSOR_STRIDE);
const _: () = assert!(smart::RECENT_GROWTH_FLAGS + 1 == SMART_DISK_STRIDE);
const _: () = assert!(usb::LAST_UPDATE + usb::LAST_UPDATE_LEN == USB_DEVICE_STRIDE);

/// Named offsets published on the diagnostics channel so that both sides
/// can confirm they agree on the layout.
pub const OFFSET_TABLE: [(&str, usize); 9] = [
    ("tempSensors", offsets::TEMP_SENSORS),
    ("tempSensorCount", offsets::TEMP_SENSOR_COUNT),
    ("smartDisks", offsets::SMART_DISKS),
    ("smartDiskCount", offsets::SMART_DISK_COUNT),
    ("futureReserved", offsets::FUTURE_RESERVED),
    ("sharedmemHash", offsets::INTEGRITY_HASH),
    ("usbDevices", offsets::USB_DEVICES),
    ("usbDeviceCount", offsets::USB_DEVICE_COUNT),
    ("extensionPad", offsets::EXTENSION_PAD),
];

/// Looks up a published offset by its wire name.
pub fn offset_of(name: &str) -> Option<usize> {
    OFFSET_TABLE
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, off)| *off)
}

/// Compares a remote offset table against the local layout.
///
/// Returns one entry per disagreeing key as `(name, local, remote)`.
/// Keys unknown to the local layout are ignored.
pub fn offset_mismatches<'a, I>(remote: I) -> Vec<(String, usize, u64)>
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    let mut out = Vec::new();
    for (name, remote_off) in remote {
        if let Some(local) = offset_of(name) {
            if local as u64 != remote_off {
                out.push((name.to_string(), local, remote_off));
            }
        }
    }
    out
}
