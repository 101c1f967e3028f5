// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Conversion between a region-sized byte buffer and a [`SnapshotRecord`].
//!
//! Decoding never trusts declared array counts: each count is clamped to
//! its array capacity before any slot is indexed, and every clamp is
//! reported back as a [`Truncation`].

use crate::layout::{self, offsets, sensor, smart, usb, REGION_SIZE};
use crate::record::{
    BoardInfo, SensorFlags, SmartDiskScore, StatusFlags, TemperatureSensor, UpdateTime,
    UsbDeviceRecord,
};
use crate::view::{ByteView, ByteViewMut};
use crate::{LayoutError, SnapshotRecord};
use sha2::{Digest, Sha256};

/// A declared array count that exceeded the array's capacity.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Truncation {
    pub array: &'static str,
    pub declared: usize,
    pub max: usize,
}

/// Result of decoding one region copy.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub record: SnapshotRecord,
    pub truncations: Vec<Truncation>,
}

/// Clamps `declared` to `max`, noting the clamp when it happens.
fn clamp_count(
    array: &'static str,
    declared: usize,
    max: usize,
    truncations: &mut Vec<Truncation>,
) -> usize {
    if declared > max {
        truncations.push(Truncation { array, declared, max });
        max
    } else {
        declared
    }
}

/// Decodes a private copy of the region.
///
/// The buffer must be exactly [`REGION_SIZE`] bytes. The ABI version is
/// decoded but not checked here; the reader decides what to do with it.
pub fn decode(bytes: &[u8]) -> Result<Decoded, LayoutError> {
    if bytes.len() != REGION_SIZE {
        return Err(LayoutError::SizeMismatch {
            expected: REGION_SIZE,
            actual: bytes.len(),
        });
    }
    let v = ByteView::new(bytes);
    let mut truncations = Vec::new();

    let sensor_count = clamp_count(
        "temperatureSensors",
        v.u16_at(offsets::TEMP_SENSOR_COUNT)? as usize,
        layout::MAX_TEMP_SENSORS,
        &mut truncations,
    );
    let temperature_sensors = (0..sensor_count)
        .map(|i| decode_sensor(v.sub(offsets::TEMP_SENSORS + i * layout::SENSOR_STRIDE, layout::SENSOR_STRIDE)?))
        .collect::<Result<Vec<_>, _>>()?;

    let disk_count = clamp_count(
        "smartDisks",
        v.u8_at(offsets::SMART_DISK_COUNT)? as usize,
        layout::MAX_SMART_DISKS,
        &mut truncations,
    );
    let smart_disks = (0..disk_count)
        .map(|i| decode_smart(v.sub(offsets::SMART_DISKS + i * layout::SMART_DISK_STRIDE, layout::SMART_DISK_STRIDE)?))
        .collect::<Result<Vec<_>, _>>()?;

    let usb_count = clamp_count(
        "usbDevices",
        v.u8_at(offsets::USB_DEVICE_COUNT)? as usize,
        layout::MAX_USB_DEVICES,
        &mut truncations,
    );
    let usb_devices = (0..usb_count)
        .map(|i| decode_usb(v.sub(offsets::USB_DEVICES + i * layout::USB_DEVICE_STRIDE, layout::USB_DEVICE_STRIDE)?))
        .collect::<Result<Vec<_>, _>>()?;

    let mut integrity_hash = [0u8; layout::INTEGRITY_HASH_LEN];
    integrity_hash.copy_from_slice(v.slice(offsets::INTEGRITY_HASH, layout::INTEGRITY_HASH_LEN)?);

    let record = SnapshotRecord {
        abi_version: v.u32_at(offsets::ABI_VERSION)?,
        write_sequence: v.u32_at(offsets::WRITE_SEQUENCE)?,
        snapshot_version: v.u32_at(offsets::SNAPSHOT_VERSION)?,
        cpu_logical_cores: v.u16_at(offsets::CPU_LOGICAL_CORES)?,
        cpu_usage_tenths: v.i16_at(offsets::CPU_USAGE_X10)?,
        memory_total_mb: v.u64_at(offsets::MEMORY_TOTAL_MB)?,
        memory_used_mb: v.u64_at(offsets::MEMORY_USED_MB)?,
        temperature_sensors,
        smart_disks,
        board: decode_board(&v)?,
        status: StatusFlags::from_bits_retain(v.u8_at(offsets::FUTURE_RESERVED)?),
        integrity_hash,
        usb_devices,
    };

    Ok(Decoded { record, truncations })
}

fn decode_sensor(v: ByteView<'_>) -> Result<TemperatureSensor, LayoutError> {
    Ok(TemperatureSensor {
        name: v.fixed_str(sensor::NAME, layout::SENSOR_NAME_LEN)?,
        value_tenths_c: v.i16_at(sensor::VALUE_TENTHS_C)? as i32,
        flags: SensorFlags::from_bits_retain(v.u8_at(sensor::FLAGS)?),
    })
}

fn decode_smart(v: ByteView<'_>) -> Result<SmartDiskScore, LayoutError> {
    Ok(SmartDiskScore {
        disk_id: v.fixed_str(smart::DISK_ID, layout::DISK_ID_LEN)?,
        score: v.i16_at(smart::SCORE)?,
        hours_on: v.i32_at(smart::HOURS_ON)?,
        wear_percent: v.i16_at(smart::WEAR_PERCENT)?,
        reallocated: v.u16_at(smart::REALLOCATED)?,
        pending: v.u16_at(smart::PENDING)?,
        uncorrectable: v.u16_at(smart::UNCORRECTABLE)?,
        temperature_c: v.i16_at(smart::TEMPERATURE_C)?,
        recent_growth_flags: v.u8_at(smart::RECENT_GROWTH_FLAGS)?,
    })
}

fn decode_usb(v: ByteView<'_>) -> Result<UsbDeviceRecord, LayoutError> {
    let mut words = [0u16; 8];
    for (i, w) in words.iter_mut().enumerate() {
        *w = v.u16_at(usb::LAST_UPDATE + i * 2)?;
    }
    Ok(UsbDeviceRecord {
        drive_path: v.fixed_str(usb::DRIVE_PATH, layout::DRIVE_PATH_LEN)?,
        volume_label: v.fixed_str(usb::VOLUME_LABEL, layout::VOLUME_LABEL_LEN)?,
        total_size: v.u64_at(usb::TOTAL_SIZE)?,
        free_space: v.u64_at(usb::FREE_SPACE)?,
        is_update_ready: v.u8_at(usb::IS_UPDATE_READY)? != 0,
        state: v.u8_at(usb::STATE)?.into(),
        last_update: UpdateTime::from_words(words),
    })
}

fn decode_board(v: &ByteView<'_>) -> Result<BoardInfo, LayoutError> {
    Ok(BoardInfo {
        manufacturer: v.fixed_str(offsets::BASEBOARD_MANUFACTURER, layout::BASEBOARD_MANUFACTURER_LEN)?,
        product: v.fixed_str(offsets::BASEBOARD_PRODUCT, layout::BASEBOARD_FIELD_LEN)?,
        version: v.fixed_str(offsets::BASEBOARD_VERSION, layout::BASEBOARD_FIELD_LEN)?,
        serial: v.fixed_str(offsets::BASEBOARD_SERIAL, layout::BASEBOARD_FIELD_LEN)?,
        bios_vendor: v.fixed_str(offsets::BIOS_VENDOR, layout::BASEBOARD_FIELD_LEN)?,
        bios_version: v.fixed_str(offsets::BIOS_VERSION, layout::BASEBOARD_FIELD_LEN)?,
        bios_date: v.fixed_str(offsets::BIOS_DATE, layout::BIOS_DATE_LEN)?,
        secure_boot_enabled: v.u8_at(offsets::SECURE_BOOT_ENABLED)? != 0,
        tpm_present: v.u8_at(offsets::TPM_PRESENT)? != 0,
        memory_slots_total: v.u16_at(offsets::MEMORY_SLOTS_TOTAL)?,
        memory_slots_used: v.u16_at(offsets::MEMORY_SLOTS_USED)?,
    })
}

// ── Encoding ───────────────────────────────────────────────────

fn check_capacity(array: &'static str, count: usize, max: usize) -> Result<(), LayoutError> {
    if count > max {
        return Err(LayoutError::TooManyEntries { array, count, max });
    }
    Ok(())
}

/// Encodes `record` into `buf`, including its write sequence and hash.
///
/// Unused array slots and reserved areas are zeroed.
pub fn encode(record: &SnapshotRecord, buf: &mut [u8]) -> Result<(), LayoutError> {
    encode_fields(record, buf)?;
    let mut v = ByteViewMut::new(buf);
    v.put_u32(offsets::WRITE_SEQUENCE, record.write_sequence)?;
    v.put_bytes(offsets::INTEGRITY_HASH, &record.integrity_hash)
}

/// Encodes every field except the write sequence and the integrity hash.
///
/// Those two belong to the writer protocol and are handled by
/// [`SnapshotWriter`](crate::SnapshotWriter).
pub(crate) fn encode_fields(record: &SnapshotRecord, buf: &mut [u8]) -> Result<(), LayoutError> {
    if buf.len() != REGION_SIZE {
        return Err(LayoutError::SizeMismatch {
            expected: REGION_SIZE,
            actual: buf.len(),
        });
    }
    check_capacity("temperatureSensors", record.temperature_sensors.len(), layout::MAX_TEMP_SENSORS)?;
    check_capacity("smartDisks", record.smart_disks.len(), layout::MAX_SMART_DISKS)?;
    check_capacity("usbDevices", record.usb_devices.len(), layout::MAX_USB_DEVICES)?;

    let mut v = ByteViewMut::new(buf);
    v.put_u32(offsets::ABI_VERSION, record.abi_version)?;
    v.put_u32(offsets::SNAPSHOT_VERSION, record.snapshot_version)?;
    v.put_u32(offsets::RESERVED_HEADER, 0)?;
    v.put_u16(offsets::CPU_LOGICAL_CORES, record.cpu_logical_cores)?;
    v.put_i16(offsets::CPU_USAGE_X10, record.cpu_usage_tenths)?;
    v.put_u64(offsets::MEMORY_TOTAL_MB, record.memory_total_mb)?;
    v.put_u64(offsets::MEMORY_USED_MB, record.memory_used_mb)?;

    v.slice_mut(offsets::TEMP_SENSORS, layout::MAX_TEMP_SENSORS * layout::SENSOR_STRIDE)?
        .fill(0);
    for (i, s) in record.temperature_sensors.iter().enumerate() {
        let base = offsets::TEMP_SENSORS + i * layout::SENSOR_STRIDE;
        v.put_fixed_str(base + sensor::NAME, layout::SENSOR_NAME_LEN, &s.name)?;
        let value = s.value_tenths_c.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        v.put_i16(base + sensor::VALUE_TENTHS_C, value)?;
        v.put_u8(base + sensor::FLAGS, s.flags.bits())?;
    }
    v.put_u16(offsets::TEMP_SENSOR_COUNT, record.temperature_sensors.len() as u16)?;

    v.slice_mut(offsets::SMART_DISKS, layout::MAX_SMART_DISKS * layout::SMART_DISK_STRIDE)?
        .fill(0);
    for (i, d) in record.smart_disks.iter().enumerate() {
        let base = offsets::SMART_DISKS + i * layout::SMART_DISK_STRIDE;
        v.put_fixed_str(base + smart::DISK_ID, layout::DISK_ID_LEN, &d.disk_id)?;
        v.put_i16(base + smart::SCORE, d.score)?;
        v.put_i32(base + smart::HOURS_ON, d.hours_on)?;
        v.put_i16(base + smart::WEAR_PERCENT, d.wear_percent)?;
        v.put_u16(base + smart::REALLOCATED, d.reallocated)?;
        v.put_u16(base + smart::PENDING, d.pending)?;
        v.put_u16(base + smart::UNCORRECTABLE, d.uncorrectable)?;
        v.put_i16(base + smart::TEMPERATURE_C, d.temperature_c)?;
        v.put_u8(base + smart::RECENT_GROWTH_FLAGS, d.recent_growth_flags)?;
    }
    v.put_u8(offsets::SMART_DISK_COUNT, record.smart_disks.len() as u8)?;

    let b = &record.board;
    v.put_fixed_str(offsets::BASEBOARD_MANUFACTURER, layout::BASEBOARD_MANUFACTURER_LEN, &b.manufacturer)?;
    v.put_fixed_str(offsets::BASEBOARD_PRODUCT, layout::BASEBOARD_FIELD_LEN, &b.product)?;
    v.put_fixed_str(offsets::BASEBOARD_VERSION, layout::BASEBOARD_FIELD_LEN, &b.version)?;
    v.put_fixed_str(offsets::BASEBOARD_SERIAL, layout::BASEBOARD_FIELD_LEN, &b.serial)?;
    v.put_fixed_str(offsets::BIOS_VENDOR, layout::BASEBOARD_FIELD_LEN, &b.bios_vendor)?;
    v.put_fixed_str(offsets::BIOS_VERSION, layout::BASEBOARD_FIELD_LEN, &b.bios_version)?;
    v.put_fixed_str(offsets::BIOS_DATE, layout::BIOS_DATE_LEN, &b.bios_date)?;
    v.put_u8(offsets::SECURE_BOOT_ENABLED, b.secure_boot_enabled as u8)?;
    v.put_u8(offsets::TPM_PRESENT, b.tpm_present as u8)?;
    v.put_u16(offsets::MEMORY_SLOTS_TOTAL, b.memory_slots_total)?;
    v.put_u16(offsets::MEMORY_SLOTS_USED, b.memory_slots_used)?;

    v.slice_mut(offsets::FUTURE_RESERVED, layout::FUTURE_RESERVED_LEN)?.fill(0);
    v.put_u8(offsets::FUTURE_RESERVED, record.status.bits())?;

    v.slice_mut(offsets::USB_DEVICES, layout::MAX_USB_DEVICES * layout::USB_DEVICE_STRIDE)?
        .fill(0);
    for (i, u) in record.usb_devices.iter().enumerate() {
        let base = offsets::USB_DEVICES + i * layout::USB_DEVICE_STRIDE;
        v.put_fixed_str(base + usb::DRIVE_PATH, layout::DRIVE_PATH_LEN, &u.drive_path)?;
        v.put_fixed_str(base + usb::VOLUME_LABEL, layout::VOLUME_LABEL_LEN, &u.volume_label)?;
        v.put_u64(base + usb::TOTAL_SIZE, u.total_size)?;
        v.put_u64(base + usb::FREE_SPACE, u.free_space)?;
        v.put_u8(base + usb::IS_UPDATE_READY, u.is_update_ready as u8)?;
        v.put_u8(base + usb::STATE, u.state.into())?;
        for (j, w) in u.last_update.to_words().iter().enumerate() {
            v.put_u16(base + usb::LAST_UPDATE + j * 2, *w)?;
        }
    }
    v.put_u8(offsets::USB_DEVICE_COUNT, record.usb_devices.len() as u8)?;

    v.slice_mut(offsets::EXTENSION_PAD, layout::EXTENSION_PAD_LEN)?.fill(0);
    Ok(())
}

// ── Integrity hash ─────────────────────────────────────────────

/// SHA-256 over the region with the write sequence and the hash field
/// itself treated as zero.
pub fn integrity_hash(bytes: &[u8]) -> Result<[u8; layout::INTEGRITY_HASH_LEN], LayoutError> {
    if bytes.len() != REGION_SIZE {
        return Err(LayoutError::SizeMismatch {
            expected: REGION_SIZE,
            actual: bytes.len(),
        });
    }
    let hash_end = offsets::INTEGRITY_HASH + layout::INTEGRITY_HASH_LEN;
    let mut hasher = Sha256::new();
    hasher.update(&bytes[..offsets::WRITE_SEQUENCE]);
    hasher.update([0u8; 4]);
    hasher.update(&bytes[offsets::SNAPSHOT_VERSION..offsets::INTEGRITY_HASH]);
    hasher.update([0u8; layout::INTEGRITY_HASH_LEN]);
    hasher.update(&bytes[hash_end..]);
    Ok(hasher.finalize().into())
}

/// Checks the stored integrity hash.
///
/// Returns `None` when the producer left the hash field zeroed.
pub fn verify_integrity(bytes: &[u8]) -> Result<Option<bool>, LayoutError> {
    let computed = integrity_hash(bytes)?;
    let stored = ByteView::new(bytes).slice(offsets::INTEGRITY_HASH, layout::INTEGRITY_HASH_LEN)?;
    if stored.iter().all(|&b| b == 0) {
        return Ok(None);
    }
    Ok(Some(stored == computed.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::UsbState;
    use crate::ABI_VERSION;

    fn sample_record() -> SnapshotRecord {
        SnapshotRecord {
            write_sequence: 42,
            snapshot_version: 7,
            cpu_logical_cores: 8,
            cpu_usage_tenths: 231,
            memory_total_mb: 16_000,
            memory_used_mb: 6_500,
            temperature_sensors: vec![
                TemperatureSensor::new("CPU Package", 61.5),
                TemperatureSensor::new("GPU Core", 48.0),
            ],
            smart_disks: vec![SmartDiskScore {
                disk_id: "nvme0".into(),
                score: 97,
                hours_on: 12_345,
                wear_percent: 3,
                temperature_c: 38,
                ..Default::default()
            }],
            board: BoardInfo {
                manufacturer: "ACME".into(),
                bios_date: "2024-05-01".into(),
                tpm_present: true,
                memory_slots_total: 4,
                memory_slots_used: 2,
                ..Default::default()
            },
            status: StatusFlags::DEGRADE_MODE,
            usb_devices: vec![UsbDeviceRecord {
                drive_path: "E:\\".into(),
                volume_label: "UPDATE".into(),
                total_size: 32 << 30,
                free_space: 1 << 30,
                is_update_ready: true,
                state: UsbState::UpdateReady,
                last_update: UpdateTime {
                    year: 2025,
                    month: 3,
                    day: 14,
                    milliseconds: 250,
                    ..Default::default()
                },
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_encode_decode_preserves_record() {
        let record = sample_record();
        let mut buf = vec![0u8; REGION_SIZE];
        encode(&record, &mut buf).unwrap();
        let decoded = decode(&buf).unwrap();
        assert!(decoded.truncations.is_empty());
        assert_eq!(decoded.record, record);
    }

    #[test]
    fn test_fields_land_on_published_offsets() {
        let mut buf = vec![0u8; REGION_SIZE];
        encode(&sample_record(), &mut buf).unwrap();
        assert_eq!(&buf[0..4], &ABI_VERSION.to_le_bytes());
        assert_eq!(&buf[4..8], &42u32.to_le_bytes());
        assert_eq!(u16::from_le_bytes([buf[1156], buf[1157]]), 2);
        assert_eq!(buf[1942], 1);
        assert_eq!(buf[3093], 1);
        assert_eq!(&buf[36..47], b"CPU Package");
        assert_eq!(&buf[1943..1947], b"ACME");
    }

    #[test]
    fn test_size_mismatch() {
        let buf = vec![0u8; REGION_SIZE - 1];
        assert_eq!(
            decode(&buf).unwrap_err(),
            LayoutError::SizeMismatch {
                expected: REGION_SIZE,
                actual: REGION_SIZE - 1
            }
        );
    }

    #[test]
    fn test_declared_count_is_clamped() {
        let mut buf = vec![0u8; REGION_SIZE];
        // 200 sensors declared, only 32 slots exist.
        buf[offsets::TEMP_SENSOR_COUNT..offsets::TEMP_SENSOR_COUNT + 2]
            .copy_from_slice(&200u16.to_le_bytes());
        buf[offsets::USB_DEVICE_COUNT] = 255;
        let decoded = decode(&buf).unwrap();
        assert_eq!(decoded.record.temperature_sensors.len(), 32);
        assert_eq!(decoded.record.usb_devices.len(), 8);
        assert_eq!(
            decoded.truncations,
            vec![
                Truncation { array: "temperatureSensors", declared: 200, max: 32 },
                Truncation { array: "usbDevices", declared: 255, max: 8 },
            ]
        );
    }

    #[test]
    fn test_encode_rejects_overfull_arrays() {
        let mut record = SnapshotRecord::default();
        record.usb_devices = vec![sample_record().usb_devices[0].clone(); 9];
        let mut buf = vec![0u8; REGION_SIZE];
        assert!(matches!(
            encode(&record, &mut buf),
            Err(LayoutError::TooManyEntries { array: "usbDevices", count: 9, max: 8 })
        ));
    }

    #[test]
    fn test_integrity_hash_ignores_sequence() {
        let mut buf = vec![0u8; REGION_SIZE];
        encode(&sample_record(), &mut buf).unwrap();
        let before = integrity_hash(&buf).unwrap();
        buf[offsets::WRITE_SEQUENCE] = 99;
        assert_eq!(integrity_hash(&buf).unwrap(), before);
        buf[offsets::MEMORY_USED_MB] ^= 1;
        assert_ne!(integrity_hash(&buf).unwrap(), before);
    }

    #[test]
    fn test_verify_integrity() {
        let mut buf = vec![0u8; REGION_SIZE];
        encode(&sample_record(), &mut buf).unwrap();
        assert_eq!(verify_integrity(&buf).unwrap(), None);

        let hash = integrity_hash(&buf).unwrap();
        buf[offsets::INTEGRITY_HASH..offsets::INTEGRITY_HASH + 32].copy_from_slice(&hash);
        assert_eq!(verify_integrity(&buf).unwrap(), Some(true));

        buf[offsets::CPU_LOGICAL_CORES] = 1;
        assert_eq!(verify_integrity(&buf).unwrap(), Some(false));
    }
}
