// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the snapshot reader.

use snapshot_layout::LayoutError;

/// The two ways a region can be incompatible with this reader.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiMismatch {
    /// The mapped region is not exactly one layout long.
    #[error("region is {actual} bytes, expected {expected}")]
    Size { expected: usize, actual: usize },

    /// The region carries a different ABI version stamp.
    #[error("abi version {actual:#010x}, expected {expected:#010x}")]
    Version { expected: u32, actual: u32 },
}

/// Errors that can occur while locating or reading the shared region.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// None of the candidate region names exist. The producer is probably
    /// not running yet.
    #[error("no snapshot region found (tried: {})", tried.join(", "))]
    NotFound { tried: Vec<String> },

    /// The region exists but does not match this build's layout. Retrying
    /// against the same producer will not help.
    #[error("incompatible snapshot region '{region}': {mismatch}")]
    AbiMismatch {
        region: String,
        #[source]
        mismatch: AbiMismatch,
    },

    /// The write sequence never settled on an even value within the budget.
    #[error("snapshot still being written after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// Opening or mapping the region failed.
    #[error("failed to map {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A field access fell outside the copied region.
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),

    /// The reader was closed or never connected.
    #[error("snapshot reader is not connected")]
    NotConnected,
}

impl ReaderError {
    /// Whether the same operation may succeed if simply tried again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReaderError::NotFound { .. } | ReaderError::Timeout { .. } | ReaderError::Io { .. }
        )
    }

    /// Whether this is a layout/version incompatibility.
    pub fn is_abi_mismatch(&self) -> bool {
        matches!(self, ReaderError::AbiMismatch { .. })
    }
}
