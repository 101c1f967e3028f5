// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Producer side of the odd/even write protocol.
//!
//! ```text
//!   seq even ──begin_write──▶ seq odd ──fields──▶ finish_write ──▶ seq even
//! ```
//!
//! Readers treat an odd sequence as "write in progress" and retry; a
//! sequence that moved while they copied means the copy is torn.

use crate::codec::{encode_fields, integrity_hash};
use crate::layout::{offsets, INTEGRITY_HASH_LEN, REGION_SIZE};
use crate::view::{ByteView, ByteViewMut};
use crate::{LayoutError, SnapshotRecord, ABI_VERSION};
use std::sync::atomic::{fence, AtomicU32, Ordering};

/// Reads the write sequence from a region buffer.
pub fn load_sequence(region: &[u8]) -> Result<u32, LayoutError> {
    let v = ByteView::new(region);
    let slot = v.slice(offsets::WRITE_SEQUENCE, 4)?;
    let ptr = slot.as_ptr();
    if (ptr as usize) % std::mem::align_of::<AtomicU32>() == 0 {
        // SAFETY: `slot` is four in-bounds bytes and the pointer is aligned
        // for `AtomicU32`. The shared borrow keeps the buffer alive.
        let atomic = unsafe { &*(ptr as *const AtomicU32) };
        Ok(u32::from_le(atomic.load(Ordering::Acquire)))
    } else {
        let value = v.u32_at(offsets::WRITE_SEQUENCE)?;
        fence(Ordering::Acquire);
        Ok(value)
    }
}

/// Publishes a new write sequence value.
///
/// Uses an atomic release store when the slot is aligned (always true for
/// page-aligned mappings) and a byte store followed by a fence otherwise.
pub fn store_sequence(region: &mut [u8], value: u32) -> Result<(), LayoutError> {
    let mut v = ByteViewMut::new(region);
    let slot = v.slice_mut(offsets::WRITE_SEQUENCE, 4)?;
    let ptr = slot.as_mut_ptr();
    if (ptr as usize) % std::mem::align_of::<AtomicU32>() == 0 {
        // SAFETY: aligned, in bounds and exclusively borrowed through `slot`.
        let atomic = unsafe { &*(ptr as *const AtomicU32) };
        atomic.store(value.to_le(), Ordering::Release);
    } else {
        fence(Ordering::Release);
        slot.copy_from_slice(&value.to_le_bytes());
    }
    Ok(())
}

/// Writes snapshots into a region buffer following the sequence protocol.
#[derive(Debug, Default)]
pub struct SnapshotWriter {
    snapshot_version: u32,
    publish_count: u64,
    compute_hash: bool,
}

impl SnapshotWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the SHA-256 integrity hash on every publish.
    pub fn with_integrity_hash(mut self, enabled: bool) -> Self {
        self.compute_hash = enabled;
        self
    }

    /// Zeroes a fresh region and stamps the ABI version with sequence 0.
    pub fn initialize(region: &mut [u8]) -> Result<(), LayoutError> {
        check_size(region)?;
        region.fill(0);
        ByteViewMut::new(region).put_u32(offsets::ABI_VERSION, ABI_VERSION)?;
        store_sequence(region, 0)
    }

    /// Moves the sequence to the next odd value and returns it.
    pub fn begin_write(region: &mut [u8]) -> Result<u32, LayoutError> {
        let current = load_sequence(region)?;
        let odd = if current % 2 == 0 {
            current.wrapping_add(1)
        } else {
            current.wrapping_add(2)
        };
        store_sequence(region, odd)?;
        fence(Ordering::Release);
        Ok(odd)
    }

    /// Moves the sequence from `odd` to the following even value.
    pub fn finish_write(region: &mut [u8], odd: u32) -> Result<u32, LayoutError> {
        fence(Ordering::Release);
        let even = odd.wrapping_add(1);
        store_sequence(region, even)?;
        Ok(even)
    }

    /// Publishes `record` and returns the new (even) write sequence.
    ///
    /// The record's ABI version and sequence are ignored; the snapshot
    /// version is bumped only when the record carries data.
    pub fn publish(&mut self, region: &mut [u8], record: &SnapshotRecord) -> Result<u32, LayoutError> {
        check_size(region)?;
        if record.has_data() {
            self.snapshot_version = self.snapshot_version.wrapping_add(1);
        }
        let mut body = record.clone();
        body.abi_version = ABI_VERSION;
        body.snapshot_version = self.snapshot_version;

        let odd = Self::begin_write(region)?;
        encode_fields(&body, region)?;
        let hash = if self.compute_hash {
            integrity_hash(region)?
        } else {
            [0u8; INTEGRITY_HASH_LEN]
        };
        ByteViewMut::new(region).put_bytes(offsets::INTEGRITY_HASH, &hash)?;
        let even = Self::finish_write(region, odd)?;

        self.publish_count += 1;
        tracing::debug!(
            "snapshot writer: sequence={even} snapshot={} sensors={}",
            self.snapshot_version,
            body.temperature_sensors.len(),
        );
        Ok(even)
    }

    /// Current snapshot version.
    pub fn snapshot_version(&self) -> u32 {
        self.snapshot_version
    }

    /// Number of completed publishes.
    pub fn publish_count(&self) -> u64 {
        self.publish_count
    }
}

fn check_size(region: &[u8]) -> Result<(), LayoutError> {
    if region.len() != REGION_SIZE {
        return Err(LayoutError::SizeMismatch {
            expected: REGION_SIZE,
            actual: region.len(),
        });
    }
    Ok(())
}
