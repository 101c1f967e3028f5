// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Owned handles over the shared snapshot memory.
//!
//! [`SharedRegion`] is the only surface the reader touches: the current
//! write sequence and a full copy. Implementations own their mapping and
//! release it on drop.

use snapshot_layout::{load_sequence, LayoutError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{fence, Ordering};
use std::sync::{Arc, Mutex};

/// Read access to a region that another process may be writing.
pub trait SharedRegion: Send {
    /// Mapped size in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples the write sequence with acquire ordering.
    fn load_sequence(&self) -> Result<u32, LayoutError>;

    /// Copies the whole region into `dst`, which must be exactly
    /// [`len`](SharedRegion::len) bytes long. The copy may be torn; callers
    /// detect that by re-sampling the sequence.
    fn copy_to(&self, dst: &mut [u8]) -> Result<(), LayoutError>;
}

fn check_copy_len(src: usize, dst: usize) -> Result<(), LayoutError> {
    if src != dst {
        return Err(LayoutError::SizeMismatch {
            expected: src,
            actual: dst,
        });
    }
    Ok(())
}

// ── Memory-mapped file ─────────────────────────────────────────

/// A read-only mapping of a shared-memory file.
pub struct MappedRegion {
    mmap: memmap2::Mmap,
    path: PathBuf,
}

impl MappedRegion {
    /// Maps `path` read-only.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        // SAFETY: the producer may rewrite the mapped bytes at any time.
        // Nothing borrows into the mapping beyond a single copy, and torn
        // copies are rejected by the sequence protocol.
        let mmap = unsafe { memmap2::Mmap::map(&file) }?;
        tracing::debug!("mapped {} ({} bytes)", path.display(), mmap.len());
        Ok(Self {
            mmap,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SharedRegion for MappedRegion {
    fn len(&self) -> usize {
        self.mmap.len()
    }

    fn load_sequence(&self) -> Result<u32, LayoutError> {
        load_sequence(&self.mmap)
    }

    fn copy_to(&self, dst: &mut [u8]) -> Result<(), LayoutError> {
        check_copy_len(self.mmap.len(), dst.len())?;
        // SAFETY: both ranges are `dst.len()` bytes and cannot overlap, since
        // `dst` is an exclusively borrowed private buffer.
        unsafe {
            std::ptr::copy_nonoverlapping(self.mmap.as_ptr(), dst.as_mut_ptr(), dst.len());
        }
        // Keep the copy ordered before the caller's second sequence sample.
        fence(Ordering::Acquire);
        Ok(())
    }
}

impl std::fmt::Debug for MappedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedRegion")
            .field("path", &self.path)
            .field("len", &self.mmap.len())
            .finish()
    }
}

// ── Writable mapping (producer side) ───────────────────────────

/// A read-write mapping used by the producer to publish snapshots.
pub struct WritableRegion {
    mmap: memmap2::MmapMut,
    path: PathBuf,
}

impl WritableRegion {
    /// Creates (or reopens) `path`, sizes it to `len` bytes and maps it.
    pub fn create(path: &Path, len: usize) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.set_len(len as u64)?;
        // SAFETY: the file was just sized to `len`; readers only ever copy
        // from it.
        let mmap = unsafe { memmap2::MmapMut::map_mut(&file) }?;
        tracing::info!("created snapshot region {} ({len} bytes)", path.display());
        Ok(Self {
            mmap,
            path: path.to_path_buf(),
        })
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.mmap
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes and unlinks the backing file.
    pub fn remove(self) -> std::io::Result<()> {
        self.mmap.flush()?;
        let path = self.path.clone();
        drop(self);
        std::fs::remove_file(path)
    }
}

impl std::fmt::Debug for WritableRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WritableRegion")
            .field("path", &self.path)
            .field("len", &self.mmap.len())
            .finish()
    }
}

// ── In-process region ──────────────────────────────────────────

/// A heap-backed region shared through an `Arc<Mutex<_>>`.
///
/// Useful when producer and consumer live in one process, and in tests.
#[derive(Debug, Clone)]
pub struct InMemoryRegion {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl InMemoryRegion {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Arc::new(Mutex::new(bytes)),
        }
    }

    /// Shared handle for the writing side.
    pub fn handle(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.bytes)
    }

    fn with_bytes<T>(&self, f: impl FnOnce(&[u8]) -> T) -> T {
        let guard = self.bytes.lock().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }
}

impl SharedRegion for InMemoryRegion {
    fn len(&self) -> usize {
        self.with_bytes(|b| b.len())
    }

    fn load_sequence(&self) -> Result<u32, LayoutError> {
        self.with_bytes(load_sequence)
    }

    fn copy_to(&self, dst: &mut [u8]) -> Result<(), LayoutError> {
        self.with_bytes(|b| {
            check_copy_len(b.len(), dst.len())?;
            dst.copy_from_slice(b);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapshot_layout::{SnapshotRecord, SnapshotWriter, REGION_SIZE};

    #[test]
    fn test_writable_then_mapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region");
        let mut w = WritableRegion::create(&path, REGION_SIZE).unwrap();
        SnapshotWriter::initialize(w.as_mut_slice()).unwrap();
        let mut writer = SnapshotWriter::new();
        let rec = SnapshotRecord {
            memory_used_mb: 3,
            ..Default::default()
        };
        writer.publish(w.as_mut_slice(), &rec).unwrap();

        let r = MappedRegion::open(&path).unwrap();
        assert_eq!(r.len(), REGION_SIZE);
        assert_eq!(r.load_sequence().unwrap(), 2);
        let mut copy = vec![0u8; REGION_SIZE];
        r.copy_to(&mut copy).unwrap();
        assert_eq!(copy.as_slice(), w.as_slice());
    }

    #[test]
    fn test_copy_rejects_wrong_destination() {
        let region = InMemoryRegion::new(vec![0u8; 16]);
        let mut dst = vec![0u8; 8];
        assert!(region.copy_to(&mut dst).is_err());
    }

    #[test]
    fn test_remove_unlinks_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone");
        let w = WritableRegion::create(&path, 64).unwrap();
        w.remove().unwrap();
        assert!(!path.exists());
    }
}
