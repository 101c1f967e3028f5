// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The consumer half of the sequence protocol.
//!
//! ```text
//!  ┌─▶ sample seq ──odd──▶ sleep(interval) ──┐
//!  │       │ even                             │
//!  │   copy region → private buffer           │
//!  │       │                                  │
//!  │   re-sample seq ──moved──────────────────┤
//!  │       │ same                             │
//!  │   decode + validate → SystemSnapshot     │
//!  └──────────────────────────────────────────┘  (≤ max_attempts samples, then Timeout)
//! ```

use crate::locator::{RegionLocator, RegionName};
use crate::region::SharedRegion;
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use crate::{AbiMismatch, ReadStats, ReaderError, SystemSnapshot};
use snapshot_layout::{decode, layout::offsets, verify_integrity, ByteView, ABI_VERSION, REGION_SIZE};
use std::sync::Arc;

/// Reads consistent snapshots from one connected region.
pub struct SnapshotReader {
    region: Option<Box<dyn SharedRegion>>,
    region_label: String,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    scratch: Vec<u8>,
    stats: ReadStats,
}

impl SnapshotReader {
    /// Tries each candidate in order and connects to the first region that
    /// exists. The region's layout is validated before returning.
    ///
    /// A region that exists but fails validation stops the search with
    /// [`ReaderError::AbiMismatch`]; it is not skipped in favour of a later
    /// candidate.
    pub fn connect(
        locator: &dyn RegionLocator,
        candidates: &[RegionName],
    ) -> Result<Self, ReaderError> {
        let mut tried = Vec::with_capacity(candidates.len());
        for name in candidates {
            let label = locator.describe(name);
            match locator.open(name) {
                Ok(Some(region)) => {
                    tracing::info!("snapshot reader: connected to {label}");
                    return Self::from_region(region, label);
                }
                Ok(None) => {
                    tracing::debug!("snapshot reader: {label} not present");
                }
                Err(e) => {
                    tracing::warn!("snapshot reader: cannot open {label}: {e}");
                }
            }
            tried.push(name.to_string());
        }
        Err(ReaderError::NotFound { tried })
    }

    /// Wraps an already opened region and validates its layout.
    pub fn from_region(
        region: Box<dyn SharedRegion>,
        label: impl Into<String>,
    ) -> Result<Self, ReaderError> {
        let reader = Self {
            region: Some(region),
            region_label: label.into(),
            policy: RetryPolicy::default(),
            sleeper: Arc::new(ThreadSleeper),
            scratch: vec![0u8; REGION_SIZE],
            stats: ReadStats::default(),
        };
        reader.validate_layout()?;
        Ok(reader)
    }

    /// Replaces the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the sleep used between parity retries.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    fn region(&self) -> Result<&dyn SharedRegion, ReaderError> {
        self.region.as_deref().ok_or(ReaderError::NotConnected)
    }

    fn mismatch(&self, mismatch: AbiMismatch) -> ReaderError {
        ReaderError::AbiMismatch {
            region: self.region_label.clone(),
            mismatch,
        }
    }

    /// Checks the mapped size and the ABI stamp against this build.
    pub fn validate_layout(&self) -> Result<(), ReaderError> {
        let region = self.region()?;
        let actual = region.len();
        if actual != REGION_SIZE {
            tracing::error!(
                "snapshot reader: {} is {actual} bytes, expected {REGION_SIZE}",
                self.region_label
            );
            return Err(self.mismatch(AbiMismatch::Size {
                expected: REGION_SIZE,
                actual,
            }));
        }

        // The ABI word is written once at region creation, so a plain copy
        // is enough here.
        let mut copy = vec![0u8; REGION_SIZE];
        region.copy_to(&mut copy)?;
        let abi = ByteView::new(&copy).u32_at(offsets::ABI_VERSION)?;
        if abi != ABI_VERSION {
            tracing::error!(
                "snapshot reader: {} has abi {abi:#010x}, expected {ABI_VERSION:#010x}",
                self.region_label
            );
            return Err(self.mismatch(AbiMismatch::Version {
                expected: ABI_VERSION,
                actual: abi,
            }));
        }
        Ok(())
    }

    /// Reads one consistent snapshot.
    ///
    /// Samples the write sequence up to `max_attempts` times. An odd
    /// sequence waits one interval; an even one copies the region and
    /// re-samples, discarding the copy if the sequence moved. The returned
    /// snapshot owns all of its data.
    pub fn read_snapshot(&mut self) -> Result<SystemSnapshot, ReaderError> {
        let max_attempts = self.policy.max_attempts;
        for attempt in 1..=max_attempts {
            self.stats.record_attempt();
            let region = self.region.as_deref().ok_or(ReaderError::NotConnected)?;

            let before = region.load_sequence()?;
            if before % 2 == 1 {
                self.stats.record_parity_retry();
                tracing::trace!("snapshot reader: sequence {before} odd (attempt {attempt})");
                if attempt < max_attempts {
                    self.sleeper.sleep(self.policy.interval);
                }
                continue;
            }

            region.copy_to(&mut self.scratch)?;
            let after = region.load_sequence()?;
            if after != before {
                self.stats.record_torn_copy();
                tracing::trace!(
                    "snapshot reader: sequence moved {before} -> {after} during copy (attempt {attempt})"
                );
                continue;
            }

            return self.finish_read();
        }

        self.stats.record_timeout();
        tracing::debug!(
            "snapshot reader: {} still being written after {max_attempts} attempts",
            self.region_label
        );
        Err(ReaderError::Timeout {
            attempts: max_attempts,
        })
    }

    /// Decodes and validates the private copy held in `scratch`.
    fn finish_read(&mut self) -> Result<SystemSnapshot, ReaderError> {
        let decoded = decode(&self.scratch)?;
        if decoded.record.abi_version != ABI_VERSION {
            return Err(self.mismatch(AbiMismatch::Version {
                expected: ABI_VERSION,
                actual: decoded.record.abi_version,
            }));
        }

        for t in &decoded.truncations {
            tracing::warn!(
                "snapshot reader: {} declares {} entries, clamped to {}",
                t.array,
                t.declared,
                t.max,
            );
        }

        let hash_mismatch = verify_integrity(&self.scratch)? == Some(false);
        if hash_mismatch {
            tracing::warn!(
                "snapshot reader: integrity hash mismatch at sequence {}",
                decoded.record.write_sequence
            );
        }

        self.stats
            .record_success(decoded.truncations.len(), hash_mismatch);
        Ok(SystemSnapshot::from_record(decoded.record))
    }

    /// Releases the mapping. Safe to call more than once.
    pub fn close(&mut self) {
        if self.region.take().is_some() {
            tracing::debug!("snapshot reader: closed {}", self.region_label);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.region.is_some()
    }

    /// Human-readable name of the connected region.
    pub fn region_label(&self) -> &str {
        &self.region_label
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn stats(&self) -> &ReadStats {
        &self.stats
    }
}

impl Drop for SnapshotReader {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SnapshotReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotReader")
            .field("region", &self.region_label)
            .field("connected", &self.region.is_some())
            .field("policy", &self.policy)
            .field("stats", &self.stats)
            .finish()
    }
}
