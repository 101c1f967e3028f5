// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the diagnostics channel.

/// Errors surfaced by the diagnostics client and publisher.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Connecting to, reading from or writing to the endpoint failed.
    #[error("diagnostics transport error on {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// A received document was not a valid diagnostics frame. The frame is
    /// dropped and the stream continues.
    #[error("malformed diagnostics frame ({len} bytes): {detail}")]
    Parse { len: usize, detail: String },

    /// A frame could not be serialised.
    #[error("failed to encode diagnostics frame: {0}")]
    Encode(#[from] serde_json::Error),

    /// `start()` was called on a client or publisher that is already running.
    #[error("diagnostics worker already running")]
    AlreadyRunning,

    /// The worker thread could not be spawned.
    #[error("failed to spawn diagnostics worker: {0}")]
    Spawn(#[source] std::io::Error),
}
