// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # snapshot-layout
//!
//! The binary contract shared by the telemetry producer and every reader:
//! a packed, little-endian region of [`REGION_SIZE`] bytes stamped with
//! [`ABI_VERSION`].
//!
//! # Contents
//! - **Layout**: offsets, strides and capacities, pinned at compile time.
//! - **Views**: bounds-checked field accessors ([`ByteView`], [`ByteViewMut`]).
//! - **Records**: the owned, typed [`SnapshotRecord`].
//! - **Codec**: [`decode`] / [`encode`], with count clamping reported as
//!   [`Truncation`]s, and the optional SHA-256 integrity hash.
//! - **Writer**: [`SnapshotWriter`], the producer half of the odd/even
//!   sequence protocol.
//!
//! # Example
//! ```
//! use snapshot_layout::{decode, SnapshotRecord, SnapshotWriter, REGION_SIZE};
//!
//! let mut region = vec![0u8; REGION_SIZE];
//! SnapshotWriter::initialize(&mut region).unwrap();
//! let mut writer = SnapshotWriter::new();
//! let record = SnapshotRecord { memory_total_mb: 4096, ..Default::default() };
//! let seq = writer.publish(&mut region, &record).unwrap();
//! assert_eq!(seq % 2, 0);
//! assert_eq!(decode(&region).unwrap().record.memory_total_mb, 4096);
//! ```

mod codec;
mod error;
pub mod layout;
mod record;
mod view;
mod writer;

pub use codec::{decode, encode, integrity_hash, verify_integrity, Decoded, Truncation};
pub use error::LayoutError;
pub use layout::{offset_mismatches, ABI_VERSION, OFFSET_TABLE, REGION_SIZE};
pub use record::{
    BoardInfo, SensorFlags, SmartDiskScore, SnapshotRecord, StatusFlags, TemperatureSensor,
    UpdateTime, UsbDeviceRecord, UsbState, UNAVAILABLE,
};
pub use view::{decode_fixed_str, ByteView, ByteViewMut};
pub use writer::{load_sequence, store_sequence, SnapshotWriter};
