// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the snapshot layout.

/// Errors raised while decoding or encoding a snapshot region.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// The buffer is not exactly one region long.
    #[error("region size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A field access would fall outside the buffer.
    #[error("field at offset {offset} (len {len}) exceeds buffer of {size} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    /// A record holds more entries than its array has slots.
    #[error("{array}: {count} entries exceed capacity {max}")]
    TooManyEntries {
        array: &'static str,
        count: usize,
        max: usize,
    },
}
