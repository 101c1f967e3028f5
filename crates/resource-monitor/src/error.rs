// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for resource sampling.

/// Errors that can occur when reading procfs or sysfs.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Failed to read a sysfs or procfs file.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a value from a system file.
    #[error("failed to parse value from {path}: {detail}")]
    ParseError { path: String, detail: String },

    /// The probe's file does not exist on this host.
    #[error("not available on this host: {path}")]
    NotAvailable { path: String },

    /// Writing the sampled record into the region failed.
    #[error("layout error: {0}")]
    Layout(#[from] snapshot_layout::LayoutError),
}
