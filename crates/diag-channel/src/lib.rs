// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # diag-channel
//!
//! Best-effort diagnostics side-channel between the telemetry producer and
//! its consumers, independent of the snapshot region's lifecycle.
//!
//! - [`ChannelClient`]: background worker that connects to the endpoint,
//!   splits the stream into [`DiagnosticsFrame`]s and hands them over a
//!   `crossbeam-channel` sender as [`ChannelEvent`]s.
//! - [`FrameDecoder`]: boundary handling and streaming JSON parsing.
//! - [`DiagnosticsPublisher`]: the producer end: one frame per interval
//!   with queued log lines and the layout offset table.
//!
//! # Example
//! ```no_run
//! use diag_channel::{ChannelClient, ChannelEvent, ClientConfig};
//!
//! let (tx, rx) = crossbeam_channel::unbounded();
//! let mut client = ChannelClient::new(ClientConfig::default());
//! client.start(tx).unwrap();
//! for event in rx.iter().take(10) {
//!     if let ChannelEvent::Frame(frame) = event {
//!         println!("seq {} logs {:?}", frame.write_sequence, frame.logs);
//!     }
//! }
//! client.stop();
//! ```

mod client;
mod decoder;
mod error;
mod frame;
mod publisher;

pub use client::{ChannelClient, ChannelEvent, ChannelState, ClientConfig, DEFAULT_ENDPOINT, READ_CHUNK};
pub use decoder::{FrameDecoder, MAX_PENDING_BYTES};
pub use error::ChannelError;
pub use frame::DiagnosticsFrame;
pub use publisher::{DiagnosticsPublisher, FrameSource};
