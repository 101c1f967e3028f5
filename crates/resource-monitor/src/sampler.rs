// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Aggregated sampling into a [`SnapshotRecord`].
//!
//! A [`Sampler`] combines memory, CPU, thermal and board readings into the
//! record the producer publishes. Only memory is required; any other probe
//! that fails leaves its fields unavailable and sets
//! [`StatusFlags::DEGRADE_MODE`].

use crate::board::read_board;
use crate::cpu::{logical_cores, CpuSampler};
use crate::memory::MemoryInfo;
use crate::thermal::read_zones;
use crate::MonitorError;
use snapshot_layout::{BoardInfo, SnapshotRecord, SnapshotWriter, StatusFlags, UNAVAILABLE};
use std::path::PathBuf;

/// Roots of the procfs and sysfs trees to sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysPaths {
    pub proc_root: PathBuf,
    pub sys_root: PathBuf,
}

impl SysPaths {
    pub fn new(proc_root: impl Into<PathBuf>, sys_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            sys_root: sys_root.into(),
        }
    }

    fn meminfo(&self) -> PathBuf {
        self.proc_root.join("meminfo")
    }

    fn stat(&self) -> PathBuf {
        self.proc_root.join("stat")
    }

    fn cpu_online(&self) -> PathBuf {
        self.sys_root.join("devices/system/cpu/online")
    }

    fn thermal_class(&self) -> PathBuf {
        self.sys_root.join("class/thermal")
    }
}

impl Default for SysPaths {
    fn default() -> Self {
        Self::new("/proc", "/sys")
    }
}

/// Stateful sampler; CPU usage needs the previous `/proc/stat` reading.
#[derive(Debug, Default)]
pub struct Sampler {
    paths: SysPaths,
    cpu: CpuSampler,
    board: Option<BoardInfo>,
}

impl Sampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_paths(paths: SysPaths) -> Self {
        Self {
            paths,
            ..Self::default()
        }
    }

    pub fn paths(&self) -> &SysPaths {
        &self.paths
    }

    /// Takes one reading of every probe.
    ///
    /// CPU usage is unavailable on the first call, since it is computed
    /// from the delta to the previous reading.
    pub fn sample(&mut self) -> Result<SnapshotRecord, MonitorError> {
        let memory = MemoryInfo::read_from(&self.paths.meminfo())?;
        let mut status = StatusFlags::empty();

        let stat = self.paths.stat();
        let cpu_usage_tenths = match self.cpu.sample(&stat) {
            Ok(usage) => usage.unwrap_or(UNAVAILABLE),
            Err(e) => {
                tracing::warn!("cpu probe failed: {e}");
                status |= StatusFlags::DEGRADE_MODE;
                UNAVAILABLE
            }
        };

        let temperature_sensors = match read_zones(&self.paths.thermal_class()) {
            Ok(sensors) => sensors,
            Err(e) => {
                tracing::debug!("thermal probe unavailable: {e}");
                status |= StatusFlags::DEGRADE_MODE;
                Vec::new()
            }
        };

        let sys_root = &self.paths.sys_root;
        let board = self.board.get_or_insert_with(|| read_board(sys_root)).clone();

        Ok(SnapshotRecord {
            cpu_logical_cores: logical_cores(&self.paths.cpu_online(), &stat),
            cpu_usage_tenths,
            memory_total_mb: memory.total_mb,
            memory_used_mb: memory.used_mb,
            temperature_sensors,
            board,
            status,
            ..SnapshotRecord::default()
        })
    }

    /// Samples and publishes the reading into `region`. Returns the even
    /// write sequence left in the region.
    pub fn publish_into(
        &mut self,
        writer: &mut SnapshotWriter,
        region: &mut [u8],
    ) -> Result<u32, MonitorError> {
        let record = self.sample()?;
        let seq = writer.publish(region, &record)?;
        Ok(seq)
    }
}
