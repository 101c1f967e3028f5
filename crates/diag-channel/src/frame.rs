// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The diagnostics frame document.
//!
//! # Wire format
//! ```json
//! {"timestamp":1700000000000,"writeSequence":42,"abiVersion":65556,
//!  "snapshotVersion":7,"expectedSize":3212,
//!  "offsets":{"tempSensors":36,"tempSensorCount":1156},
//!  "logs":["sensor scan complete"]}
//! ```
//! Unknown keys are ignored and every key is optional.

use snapshot_layout::{offset_mismatches, OFFSET_TABLE, REGION_SIZE};
use std::collections::BTreeMap;

/// One document emitted by the producer's diagnostics logger.
///
/// `write_sequence` and `abi_version` echo the region at emission time and
/// are only used to correlate a frame with a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagnosticsFrame {
    /// Emission time in Unix milliseconds.
    pub timestamp: u64,
    pub write_sequence: u32,
    pub abi_version: u32,
    pub snapshot_version: u32,
    pub cpu_logical_cores: u32,
    #[serde(rename = "memoryTotalMB")]
    pub memory_total_mb: u64,
    #[serde(rename = "memoryUsedMB")]
    pub memory_used_mb: u64,
    /// Region size the producer was built with; `0` when not sent.
    pub expected_size: u32,
    /// Named field offsets the producer was built with.
    pub offsets: BTreeMap<String, u32>,
    /// Log lines queued since the previous frame.
    pub logs: Vec<String>,
}

impl DiagnosticsFrame {
    /// Fills `offsets` and `expected_size` from this build's layout.
    pub fn with_layout_offsets(mut self) -> Self {
        self.offsets = OFFSET_TABLE
            .iter()
            .map(|(name, off)| (name.to_string(), *off as u32))
            .collect();
        self.expected_size = REGION_SIZE as u32;
        self
    }

    /// Offsets on which the producer disagrees with this build, as
    /// `(name, local, remote)`. A size disagreement is reported under
    /// `expectedSize`.
    pub fn layout_mismatches(&self) -> Vec<(String, usize, u64)> {
        let mut out = offset_mismatches(self.offsets.iter().map(|(k, v)| (k.as_str(), *v as u64)));
        if self.expected_size != 0 && self.expected_size as usize != REGION_SIZE {
            out.push(("expectedSize".to_string(), REGION_SIZE, self.expected_size as u64));
        }
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_default() {
        let frame: DiagnosticsFrame =
            serde_json::from_str(r#"{"writeSequence":7,"logs":["boot ok"]}"#).unwrap();
        assert_eq!(frame.write_sequence, 7);
        assert_eq!(frame.abi_version, 0);
        assert!(frame.offsets.is_empty());
        assert_eq!(frame.logs, vec!["boot ok"]);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let frame: DiagnosticsFrame = serde_json::from_str(
            r#"{"timestamp":5,"memoryTotalMB":8192,"gpuName":"x","nested":{"a":[1,2]}}"#,
        )
        .unwrap();
        assert_eq!(frame.timestamp, 5);
        assert_eq!(frame.memory_total_mb, 8192);
    }

    #[test]
    fn test_wire_key_names() {
        let json = DiagnosticsFrame {
            memory_used_mb: 1,
            ..Default::default()
        }
        .to_json()
        .unwrap();
        assert!(json.contains("\"memoryUsedMB\":1"));
        assert!(json.contains("\"writeSequence\":0"));
    }

    #[test]
    fn test_own_layout_has_no_mismatches() {
        let frame = DiagnosticsFrame::default().with_layout_offsets();
        assert_eq!(frame.offsets["usbDevices"], 2525);
        assert!(frame.layout_mismatches().is_empty());
    }

    #[test]
    fn test_layout_mismatches_reported() {
        let frame: DiagnosticsFrame = serde_json::from_str(
            r#"{"expectedSize":3216,"offsets":{"tempSensors":40,"extensionPad":3094}}"#,
        )
        .unwrap();
        let diff = frame.layout_mismatches();
        assert_eq!(
            diff,
            vec![
                ("tempSensors".to_string(), 36, 40),
                ("expectedSize".to_string(), 3212, 3216),
            ]
        );
    }
}
