// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # resource-monitor
//!
//! Linux sampling collaborator for the telemetry producer. Reads `/proc`
//! and `/sys` and turns the readings into a
//! [`SnapshotRecord`](snapshot_layout::SnapshotRecord) ready to publish.
//!
//! # Probes
//! - **Memory**: `/proc/meminfo` (required).
//! - **CPU**: utilisation from `/proc/stat` deltas, logical core count.
//! - **Thermal**: every `/sys/class/thermal/thermal_zone*`.
//! - **Board**: SMBIOS strings, Secure Boot and TPM presence.
//!
//! Probes other than memory degrade gracefully: the field is left
//! unavailable and the record's status carries `DEGRADE_MODE`.
//!
//! # Example
//! ```no_run
//! use resource_monitor::Sampler;
//!
//! let mut sampler = Sampler::new();
//! let record = sampler.sample().expect("failed to read system state");
//! println!("{} MB used of {}", record.memory_used_mb, record.memory_total_mb);
//! ```

mod board;
mod cpu;
mod error;
mod memory;
mod sampler;
pub(crate) mod thermal;

pub use board::read_board;
pub use cpu::{logical_cores, CpuSampler, CpuTimes};
pub use error::MonitorError;
pub use memory::MemoryInfo;
pub use sampler::{Sampler, SysPaths};
pub use thermal::read_zones;
