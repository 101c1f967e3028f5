// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # coordinator
//!
//! Resilient client-side coordinator for the telemetry link.
//!
//! [`UpdateCoordinator`] composes a [`snapshot_reader::SnapshotReader`] and
//! a [`diag_channel::ChannelClient`], applies a circuit breaker over
//! consecutive poll failures and keeps a bounded ring of recent diagnostic
//! log lines. Consumers read the last good snapshot through
//! [`current_data`](UpdateCoordinator::current_data), which never does I/O.
//!
//! # Example
//! ```no_run
//! use coordinator::{CoordinatorConfig, UpdateCoordinator};
//!
//! let mut c = UpdateCoordinator::new(CoordinatorConfig::default()).unwrap();
//! c.start().unwrap();
//! loop {
//!     c.poll();
//!     if let Some(snap) = c.current_data() {
//!         println!("{} [{}]", snap.summary(), c.connection_status());
//!     }
//!     std::thread::sleep(c.config().poll_interval());
//! }
//! ```

mod config;
mod coordinator;
mod error;
mod log_ring;

pub use config::CoordinatorConfig;
pub use coordinator::{CoordinatorEvent, CoordinatorStatus, ReaderFactory, UpdateCoordinator};
pub use error::CoordinatorError;
pub use log_ring::LogRing;
