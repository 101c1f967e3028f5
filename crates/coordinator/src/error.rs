// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the update coordinator.

/// Errors surfaced by the coordinator's lifecycle operations.
///
/// Per-poll failures never escape as errors; they are folded into the
/// connection status and `last_error` instead.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// Connecting to or validating the snapshot region failed.
    #[error("snapshot reader: {0}")]
    Reader(#[from] snapshot_reader::ReaderError),

    /// The diagnostics client could not be started.
    #[error("diagnostics channel: {0}")]
    Channel(#[from] diag_channel::ChannelError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Spawning the frame pump thread failed.
    #[error("failed to spawn frame pump: {0}")]
    Spawn(#[source] std::io::Error),
}

impl CoordinatorError {
    /// Whether this is a layout/version incompatibility with the producer.
    pub fn is_abi_mismatch(&self) -> bool {
        matches!(self, CoordinatorError::Reader(e) if e.is_abi_mismatch())
    }
}
