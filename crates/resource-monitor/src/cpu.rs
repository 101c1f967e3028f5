// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! CPU utilisation and logical core count.
//!
//! Reads CPU state from:
//! - `/proc/stat`: aggregate jiffy counters; utilisation is the busy share
//!   of the delta between two samples.
//! - `/sys/devices/system/cpu/online`: online core count, falling back to
//!   the `cpuN` lines of `/proc/stat`.

use crate::thermal::read_sysfs_file;
use crate::MonitorError;
use std::path::Path;

/// Aggregate jiffy counters from the `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTimes {
    /// `idle + iowait`.
    pub idle: u64,
    /// Sum of user, nice, system, idle, iowait, irq, softirq and steal.
    pub total: u64,
}

impl CpuTimes {
    /// Parses the aggregate `cpu` line of a `/proc/stat`-formatted string.
    pub(crate) fn parse(content: &str, source_path: &Path) -> Result<Self, MonitorError> {
        let parse_error = |detail: String| MonitorError::ParseError {
            path: source_path.display().to_string(),
            detail,
        };
        let line = content
            .lines()
            .find(|l| l.split_whitespace().next() == Some("cpu"))
            .ok_or_else(|| parse_error("aggregate cpu line not found".into()))?;

        let fields: Vec<u64> = line
            .split_whitespace()
            .skip(1)
            .take(8)
            .map(|f| {
                f.parse::<u64>()
                    .map_err(|_| parse_error(format!("expected integer jiffies, got '{f}'")))
            })
            .collect::<Result<_, _>>()?;
        if fields.len() < 4 {
            return Err(parse_error(format!("only {} cpu fields", fields.len())));
        }

        let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
        Ok(Self {
            idle,
            total: fields.iter().sum(),
        })
    }

    /// Busy share between `earlier` and `self`, in tenths of a percent.
    /// `None` when no time has elapsed or the counters went backwards.
    pub fn usage_tenths_since(&self, earlier: &CpuTimes) -> Option<i16> {
        let total = self.total.checked_sub(earlier.total)?;
        let idle = self.idle.checked_sub(earlier.idle)?;
        if total == 0 || idle > total {
            return None;
        }
        let busy = (total - idle) as f64 / total as f64;
        Some((busy * 1000.0).round() as i16)
    }
}

/// Turns successive `/proc/stat` samples into utilisation figures.
#[derive(Debug, Default)]
pub struct CpuSampler {
    previous: Option<CpuTimes>,
}

impl CpuSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `stat_path` and returns usage since the previous call, in
    /// tenths of a percent. The first call only primes the sampler.
    pub fn sample(&mut self, stat_path: &Path) -> Result<Option<i16>, MonitorError> {
        let content = std::fs::read_to_string(stat_path).map_err(|e| MonitorError::ReadError {
            path: stat_path.display().to_string(),
            source: e,
        })?;
        let now = CpuTimes::parse(&content, stat_path)?;
        Ok(self.observe(now))
    }

    pub(crate) fn observe(&mut self, now: CpuTimes) -> Option<i16> {
        let usage = self
            .previous
            .as_ref()
            .and_then(|prev| now.usage_tenths_since(prev));
        self.previous = Some(now);
        usage
    }
}

/// Determines the number of logical cores.
///
/// Tries the sysfs `online` range first (e.g. `"0-3"` → 4), then counts the
/// per-core lines of `/proc/stat`, and finally asks the standard library.
pub fn logical_cores(online_path: &Path, stat_path: &Path) -> u16 {
    if let Ok(content) = read_sysfs_file(online_path) {
        if let Some(count) = parse_cpu_range(&content) {
            return count.min(u16::MAX as u32) as u16;
        }
    }

    if let Ok(content) = std::fs::read_to_string(stat_path) {
        let count = content
            .lines()
            .filter_map(|l| l.split_whitespace().next())
            .filter(|name| {
                name.len() > 3
                    && name.starts_with("cpu")
                    && name[3..].chars().all(|c| c.is_ascii_digit())
            })
            .count();
        if count > 0 {
            return count.min(u16::MAX as usize) as u16;
        }
    }

    std::thread::available_parallelism()
        .map(|n| n.get().min(u16::MAX as usize) as u16)
        .unwrap_or(1)
}

/// Parses a CPU range string like `"0-3"` → 4, `"0"` → 1, `"0,2-3"` → 3.
fn parse_cpu_range(s: &str) -> Option<u32> {
    let mut total = 0u32;
    for part in s.split(',') {
        let part = part.trim();
        if let Some((start_s, end_s)) = part.split_once('-') {
            let start: u32 = start_s.trim().parse().ok()?;
            let end: u32 = end_s.trim().parse().ok()?;
            total += end.checked_sub(start)? + 1;
        } else {
            let _: u32 = part.parse().ok()?;
            total += 1;
        }
    }
    (total > 0).then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT_A: &str = "\
cpu  1000 0 500 8000 500 0 0 0 0 0
cpu0 500 0 250 4000 250 0 0 0 0 0
cpu1 500 0 250 4000 250 0 0 0 0 0
intr 12345
";
    const STAT_B: &str = "\
cpu  1600 0 700 8600 600 0 0 0 0 0
cpu0 800 0 350 4300 300 0 0 0 0 0
cpu1 800 0 350 4300 300 0 0 0 0 0
";

    fn times(s: &str) -> CpuTimes {
        CpuTimes::parse(s, Path::new("/proc/stat")).unwrap()
    }

    #[test]
    fn test_parse_aggregate_line() {
        let t = times(STAT_A);
        assert_eq!(t.idle, 8500);
        assert_eq!(t.total, 10000);
    }

    #[test]
    fn test_usage_delta() {
        // 1500 jiffies elapsed, 700 of them idle: 53.3% busy.
        assert_eq!(times(STAT_B).usage_tenths_since(&times(STAT_A)), Some(533));
    }

    #[test]
    fn test_usage_requires_progress() {
        let t = times(STAT_A);
        assert_eq!(t.usage_tenths_since(&t), None);
        assert_eq!(t.usage_tenths_since(&times(STAT_B)), None);
    }

    #[test]
    fn test_sampler_primes_on_first_call() {
        let mut s = CpuSampler::new();
        assert_eq!(s.observe(times(STAT_A)), None);
        assert_eq!(s.observe(times(STAT_B)), Some(533));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(CpuTimes::parse("intr 1 2 3\n", Path::new("/proc/stat")).is_err());
        assert!(CpuTimes::parse("cpu a b c d\n", Path::new("/proc/stat")).is_err());
        assert!(CpuTimes::parse("cpu 1 2\n", Path::new("/proc/stat")).is_err());
    }

    #[test]
    fn test_parse_cpu_range() {
        assert_eq!(parse_cpu_range("0-3"), Some(4));
        assert_eq!(parse_cpu_range("0,2-3"), Some(3));
        assert_eq!(parse_cpu_range("0-1,3-5"), Some(5));
        assert_eq!(parse_cpu_range(""), None);
        assert_eq!(parse_cpu_range("3-1"), None);
    }

    #[test]
    fn test_logical_cores_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let online = dir.path().join("online");
        let stat = dir.path().join("stat");
        std::fs::write(&stat, STAT_A).unwrap();
        assert_eq!(logical_cores(&online, &stat), 2);

        std::fs::write(&online, "0-7\n").unwrap();
        assert_eq!(logical_cores(&online, &stat), 8);

        let none = dir.path().join("none");
        assert!(logical_cores(&none, &none) >= 1);
    }
}
