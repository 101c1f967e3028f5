// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Coordinator configuration loaded from TOML files or constructed
//! programmatically.
//!
//! # TOML Format
//! ```toml
//! region_names = ["Global/SystemMonitorSharedMemory", "SystemMonitorSharedMemory"]
//! shm_dir = "/dev/shm"
//! diagnostics_socket = "/tmp/tcmt_diag.sock"
//! poll_interval_ms = 1000
//! failure_threshold = 5
//! enable_diagnostics = true
//! ```
//! Every key is optional.

use crate::CoordinatorError;
use diag_channel::{ClientConfig, DEFAULT_ENDPOINT};
use snapshot_reader::{RegionName, RetryPolicy, ShmDirectory, DEFAULT_REGION_NAME, DEFAULT_SHM_DIR};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the update coordinator.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Region names tried in order. Empty means the scoped fallback list
    /// for [`DEFAULT_REGION_NAME`].
    pub region_names: Vec<String>,
    /// Directory holding shared-memory files.
    pub shm_dir: PathBuf,
    /// Diagnostics endpoint.
    pub diagnostics_socket: PathBuf,
    /// Suggested interval between polls for callers that drive a loop.
    pub poll_interval_ms: u64,
    /// Parity retry budget per read.
    pub retry_attempts: u32,
    pub retry_interval_ms: u64,
    /// Consecutive poll failures before the connection is reported lost.
    pub failure_threshold: u32,
    /// Log ring capacity enforced on insert.
    pub log_capacity: usize,
    /// Log ring size after an explicit cleanup.
    pub log_trim_to: usize,
    pub reconnect_backoff_ms: u64,
    pub connect_timeout_ms: u64,
    /// Whether to run the diagnostics client at all.
    pub enable_diagnostics: bool,
}

impl CoordinatorConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, CoordinatorError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoordinatorError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string and validates it.
    pub fn from_toml(toml_str: &str) -> Result<Self, CoordinatorError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| CoordinatorError::ConfigError(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, CoordinatorError> {
        toml::to_string_pretty(self)
            .map_err(|e| CoordinatorError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Rejects settings the coordinator cannot honour.
    pub fn validate(&self) -> Result<(), CoordinatorError> {
        if self.failure_threshold == 0 {
            return Err(CoordinatorError::ConfigError(
                "failure_threshold must be at least 1".into(),
            ));
        }
        if self.log_trim_to > self.log_capacity {
            return Err(CoordinatorError::ConfigError(format!(
                "log_trim_to ({}) exceeds log_capacity ({})",
                self.log_trim_to, self.log_capacity
            )));
        }
        self.candidates().map(|_| ())
    }

    /// Resolves the ordered list of region names to try.
    pub fn candidates(&self) -> Result<Vec<RegionName>, CoordinatorError> {
        if self.region_names.is_empty() {
            return Ok(RegionName::candidates(DEFAULT_REGION_NAME));
        }
        self.region_names
            .iter()
            .map(|s| {
                s.parse::<RegionName>()
                    .map_err(|e| CoordinatorError::ConfigError(format!("region name '{s}': {e}")))
            })
            .collect()
    }

    pub fn locator(&self) -> ShmDirectory {
        ShmDirectory::new(self.shm_dir.clone())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_interval_ms),
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Builds the diagnostics client settings.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            endpoint: self.diagnostics_socket.clone(),
            reconnect_backoff: Duration::from_millis(self.reconnect_backoff_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            ..ClientConfig::default()
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            region_names: Vec::new(),
            shm_dir: PathBuf::from(DEFAULT_SHM_DIR),
            diagnostics_socket: PathBuf::from(DEFAULT_ENDPOINT),
            poll_interval_ms: 1000,
            retry_attempts: policy.max_attempts,
            retry_interval_ms: policy.interval.as_millis() as u64,
            failure_threshold: 5,
            log_capacity: 100,
            log_trim_to: 50,
            reconnect_backoff_ms: 1000,
            connect_timeout_ms: 3000,
            enable_diagnostics: true,
        }
    }
}
