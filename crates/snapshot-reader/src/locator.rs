// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Logical region names and how they resolve to mappings.
//!
//! A region is published under one logical name in one of three scopes.
//! Readers try the scopes in a fixed order: global, session-local,
//! unscoped. On Unix, [`ShmDirectory`] maps each scope to a file:
//!
//! ```text
//!   Global\SystemMonitorSharedMemory  →  /dev/shm/Global.SystemMonitorSharedMemory
//!   Local\SystemMonitorSharedMemory   →  /dev/shm/Local.SystemMonitorSharedMemory
//!   SystemMonitorSharedMemory         →  /dev/shm/SystemMonitorSharedMemory
//! ```

use crate::region::{MappedRegion, SharedRegion, WritableRegion};
use std::path::{Path, PathBuf};

/// Well-known base name of the snapshot region.
pub const DEFAULT_REGION_NAME: &str = "SystemMonitorSharedMemory";

/// Default directory holding POSIX shared-memory objects.
pub const DEFAULT_SHM_DIR: &str = "/dev/shm";

/// Visibility scope of a region name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionScope {
    Global,
    Local,
    Unscoped,
}

impl RegionScope {
    fn prefix(self) -> Option<&'static str> {
        match self {
            RegionScope::Global => Some("Global"),
            RegionScope::Local => Some("Local"),
            RegionScope::Unscoped => None,
        }
    }
}

/// A scoped logical region name such as `Global\SystemMonitorSharedMemory`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegionName {
    pub scope: RegionScope,
    pub base: String,
}

impl RegionName {
    pub fn new(scope: RegionScope, base: impl Into<String>) -> Self {
        Self {
            scope,
            base: base.into(),
        }
    }

    /// The standard fallback order for `base`: global, local, unscoped.
    pub fn candidates(base: &str) -> Vec<RegionName> {
        [RegionScope::Global, RegionScope::Local, RegionScope::Unscoped]
            .into_iter()
            .map(|scope| RegionName::new(scope, base))
            .collect()
    }

    /// File name used for this region inside a shared-memory directory.
    pub fn file_name(&self) -> String {
        match self.scope.prefix() {
            Some(prefix) => format!("{prefix}.{}", self.base),
            None => self.base.clone(),
        }
    }
}

impl std::fmt::Display for RegionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.scope.prefix() {
            Some(prefix) => write!(f, "{prefix}\\{}", self.base),
            None => write!(f, "{}", self.base),
        }
    }
}

impl std::str::FromStr for RegionName {
    type Err = String;

    /// Accepts `Global\Name`, `Global/Name`, `Local\Name`, `Local/Name` or
    /// a bare `Name`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (scope, base) = match s.split_once(['\\', '/']) {
            Some((prefix, rest)) if prefix.eq_ignore_ascii_case("global") => {
                (RegionScope::Global, rest)
            }
            Some((prefix, rest)) if prefix.eq_ignore_ascii_case("local") => {
                (RegionScope::Local, rest)
            }
            Some((prefix, _)) => return Err(format!("unknown region scope '{prefix}'")),
            None => (RegionScope::Unscoped, s),
        };
        if base.is_empty() || base.contains(['\\', '/']) {
            return Err(format!("invalid region name '{s}'"));
        }
        Ok(RegionName::new(scope, base))
    }
}

/// Resolves region names to mappings.
pub trait RegionLocator: Send + Sync {
    /// Opens `name` read-only. `Ok(None)` means the region does not exist.
    fn open(&self, name: &RegionName) -> std::io::Result<Option<Box<dyn SharedRegion>>>;

    /// Human-readable location of `name`, used in log and error messages.
    fn describe(&self, name: &RegionName) -> String {
        name.to_string()
    }
}

/// Locates regions as files in a shared-memory directory.
#[derive(Debug, Clone)]
pub struct ShmDirectory {
    root: PathBuf,
}

impl ShmDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the backing file for `name`.
    pub fn path_of(&self, name: &RegionName) -> PathBuf {
        self.root.join(name.file_name())
    }

    /// Creates the backing file for `name` and maps it writable.
    pub fn create(&self, name: &RegionName, len: usize) -> std::io::Result<WritableRegion> {
        WritableRegion::create(&self.path_of(name), len)
    }
}

impl Default for ShmDirectory {
    fn default() -> Self {
        Self::new(DEFAULT_SHM_DIR)
    }
}

impl RegionLocator for ShmDirectory {
    fn open(&self, name: &RegionName) -> std::io::Result<Option<Box<dyn SharedRegion>>> {
        let path = self.path_of(name);
        match MappedRegion::open(&path) {
            Ok(region) => Ok(Some(Box::new(region))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn describe(&self, name: &RegionName) -> String {
        format!("{name} ({})", self.path_of(name).display())
    }
}
