// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! System memory via `/proc/meminfo`.

use crate::MonitorError;
use std::path::Path;

/// System memory state in megabytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MemoryInfo {
    pub total_mb: u64,
    /// Memory the kernel considers available without swapping.
    pub available_mb: u64,
    /// `total - available`.
    pub used_mb: u64,
}

impl MemoryInfo {
    /// Reads memory information from a `meminfo`-formatted file.
    pub fn read_from(path: &Path) -> Result<Self, MonitorError> {
        let content = std::fs::read_to_string(path).map_err(|e| MonitorError::ReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    /// Parses the content of a `/proc/meminfo`-formatted string.
    ///
    /// Kernels older than 3.14 lack `MemAvailable`; `MemFree + Buffers +
    /// Cached` is used instead.
    pub(crate) fn parse(content: &str, source_path: &Path) -> Result<Self, MonitorError> {
        let mut total_kb = None;
        let mut available_kb = None;
        let mut fallback_kb = 0u64;

        for line in content.lines() {
            let mut parts = line.split_whitespace();
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };
            match key {
                "MemTotal:" => total_kb = Some(parse_kb_value(value, source_path)?),
                "MemAvailable:" => available_kb = Some(parse_kb_value(value, source_path)?),
                "MemFree:" | "Buffers:" | "Cached:" => {
                    fallback_kb += parse_kb_value(value, source_path)?
                }
                _ => {}
            }
        }

        let total_kb = total_kb.ok_or_else(|| MonitorError::ParseError {
            path: source_path.display().to_string(),
            detail: "MemTotal not found".to_string(),
        })?;
        let available_kb = available_kb.unwrap_or(fallback_kb).min(total_kb);

        let total_mb = total_kb / 1024;
        let available_mb = available_kb / 1024;
        Ok(Self {
            total_mb,
            available_mb,
            used_mb: total_mb.saturating_sub(available_mb),
        })
    }
}

fn parse_kb_value(s: &str, source_path: &Path) -> Result<u64, MonitorError> {
    s.parse::<u64>().map_err(|_| MonitorError::ParseError {
        path: source_path.display().to_string(),
        detail: format!("expected integer kB value, got '{s}'"),
    })
}
