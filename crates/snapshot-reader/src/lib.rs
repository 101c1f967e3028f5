// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # snapshot-reader
//!
//! Turns the producer's shared memory region into typed, validated
//! [`SystemSnapshot`]s without ever blocking the producer.
//!
//! # Flow
//! ```text
//! RegionLocator ──connect──▶ SnapshotReader ──read_snapshot──▶ SystemSnapshot
//!   (ShmDirectory)             │  validate_layout (size + ABI, fatal)
//!                              │  retry-on-parity (RetryPolicy + Sleeper)
//!                              └─ ReadStats
//! ```
//!
//! # Example
//! ```no_run
//! use snapshot_reader::{RegionName, ShmDirectory, SnapshotReader, DEFAULT_REGION_NAME};
//!
//! let locator = ShmDirectory::default();
//! let candidates = RegionName::candidates(DEFAULT_REGION_NAME);
//! let mut reader = SnapshotReader::connect(&locator, &candidates).expect("producer not running");
//! let snap = reader.read_snapshot().expect("read failed");
//! println!("{}", snap.summary());
//! ```

mod error;
mod locator;
mod reader;
mod region;
mod retry;
mod snapshot;
mod stats;

pub use error::{AbiMismatch, ReaderError};
pub use locator::{
    RegionLocator, RegionName, RegionScope, ShmDirectory, DEFAULT_REGION_NAME, DEFAULT_SHM_DIR,
};
pub use reader::SnapshotReader;
pub use region::{InMemoryRegion, MappedRegion, SharedRegion, WritableRegion};
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};
pub use snapshot::{classify_sensor, SensorClass, SystemSnapshot};
pub use stats::ReadStats;
