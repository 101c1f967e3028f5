// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Read-path statistics.
//!
//! [`ReadStats`] counts what the retry loop ran into: odd sequences,
//! torn copies, timeouts and clamped arrays. A reader that shows many
//! parity retries is polling in step with the producer's write window.

/// Cumulative statistics for one [`SnapshotReader`](crate::SnapshotReader).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReadStats {
    /// Completed `read_snapshot` calls that returned a snapshot.
    pub successful_reads: u64,
    /// Sequence samples taken across all reads.
    pub attempts: u64,
    /// Samples that found the sequence odd.
    pub parity_retries: u64,
    /// Copies discarded because the sequence moved during the copy.
    pub torn_copies: u64,
    /// Reads that ran out of attempts.
    pub timeouts: u64,
    /// Array counts that had to be clamped to capacity.
    pub clamped_arrays: u64,
    /// Snapshots whose integrity hash did not match their contents.
    pub hash_mismatches: u64,
}

impl ReadStats {
    pub(crate) fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    pub(crate) fn record_parity_retry(&mut self) {
        self.parity_retries += 1;
    }

    pub(crate) fn record_torn_copy(&mut self) {
        self.torn_copies += 1;
    }

    pub(crate) fn record_timeout(&mut self) {
        self.timeouts += 1;
    }

    pub(crate) fn record_success(&mut self, clamped: usize, hash_mismatch: bool) {
        self.successful_reads += 1;
        self.clamped_arrays += clamped as u64;
        if hash_mismatch {
            self.hash_mismatches += 1;
        }
    }

    /// Average samples needed per successful read.
    pub fn attempts_per_read(&self) -> f64 {
        if self.successful_reads == 0 {
            return 0.0;
        }
        self.attempts as f64 / self.successful_reads as f64
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Reads: {} ok ({:.2} attempts/read), {} parity retries, {} torn copies, \
             {} timeouts, {} clamped arrays, {} hash mismatches",
            self.successful_reads,
            self.attempts_per_read(),
            self.parity_retries,
            self.torn_copies,
            self.timeouts,
            self.clamped_arrays,
            self.hash_mismatches,
        )
    }
}
