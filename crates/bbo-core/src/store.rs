//! Append-only, memory-mapped record store.
//!
//! [`AppendLog`] owns a pre-sized, zero-filled region of `capacity` slots and
//! hands out exactly one slot per [`append`](AppendLog::append), in call
//! order. The region never grows: once every slot is used, further appends
//! fail with [`StoreError::CapacityExceeded`] instead of writing past the
//! mapping.
//!
//! # Memory layout
//!
//! ```text
//! ┌──────────┬──────────┬─────┬────────────────┬─────────────────────┐
//! │ slot[0]  │ slot[1]  │ ... │ slot[len - 1]  │ zero slots ...      │
//! └──────────┴──────────┴─────┴────────────────┴─────────────────────┘
//!   ◄────────────── written ────────────────►   ◄─ event_time == 0 ─►
//! ```
//!
//! There is no header: the file is exactly `capacity * RECORD_SIZE` bytes.
//! Durability follows the platform's mmap flush semantics; pages reach disk
//! when the OS writes them back, on [`flush`](AppendLog::flush), or on
//! [`close`](AppendLog::close).
//!
//! Single writer only. The store takes `&mut self` for appends and holds no
//! lock; concurrent writers from other processes are not supported.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::MmapMut;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::types::{RECORD_SIZE, Record};

// ---------------------------------------------------------------------------
// Backing region
// ---------------------------------------------------------------------------

/// Byte storage behind an [`AppendLog`].
///
/// Implemented by the writable file mapping and by [`MemRegion`], a plain
/// heap buffer used for tests and in-memory capture.
pub trait Region {
    fn bytes(&self) -> &[u8];
    fn bytes_mut(&mut self) -> &mut [u8];

    /// Synchronously write dirty pages back to the backing store.
    fn flush(&self) -> std::io::Result<()> {
        Ok(())
    }

    /// Schedule write-back without waiting for it.
    fn flush_async(&self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Region for MmapMut {
    fn bytes(&self) -> &[u8] {
        self
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self
    }

    fn flush(&self) -> std::io::Result<()> {
        MmapMut::flush(self)
    }

    fn flush_async(&self) -> std::io::Result<()> {
        MmapMut::flush_async(self)
    }
}

/// Zero-initialized heap region.
#[derive(Debug, Clone)]
pub struct MemRegion {
    buf: Vec<u8>,
}

impl MemRegion {
    pub fn new(slots: usize) -> Self {
        Self { buf: vec![0u8; slots * RECORD_SIZE] }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl Region for MemRegion {
    fn bytes(&self) -> &[u8] {
        &self.buf
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

// ---------------------------------------------------------------------------
// AppendLog
// ---------------------------------------------------------------------------

/// A bounded append-only log of [`Record`] slots.
pub struct AppendLog<R: Region = MmapMut> {
    region: R,
    /// Number of slots in the region.
    capacity: usize,
    /// Index of the next free slot; also the number of used slots.
    cursor: usize,
    /// Backing file, if any (for logging).
    path: Option<PathBuf>,
}

impl AppendLog<MmapMut> {
    /// Create (or truncate) the file at `path`, size it to exactly
    /// `capacity * RECORD_SIZE` bytes and map it read/write.
    ///
    /// Any previous content is discarded so every slot starts zeroed.
    pub fn open_or_create(path: impl AsRef<Path>, capacity: usize) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if capacity == 0 {
            return Err(StoreError::init(path, "capacity must be at least one slot", None));
        }
        let total_size = capacity
            .checked_mul(RECORD_SIZE)
            .ok_or_else(|| StoreError::init(path, format!("capacity {capacity} overflows the address space"), None))?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::init(path, "cannot create parent directory", Some(e)))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| StoreError::init(path, "cannot create file", Some(e)))?;

        file.set_len(total_size as u64)
            .map_err(|e| StoreError::init(path, format!("cannot resize to {total_size} bytes"), Some(e)))?;

        // SAFETY: the file was just truncated and sized by us, and this store
        // is its only writer for the process lifetime. Other processes may
        // map it read-only; they accept torn reads of the newest slot.
        let mmap = unsafe { MmapMut::map_mut(&file) }
            .map_err(|e| StoreError::init(path, "mmap failed", Some(e)))?;

        info!("[store] mapped {} ({capacity} slots, {total_size} bytes)", path.display());

        Ok(Self { region: mmap, capacity, cursor: 0, path: Some(path.to_path_buf()) })
    }
}

impl<R: Region> AppendLog<R> {
    /// Wrap an existing zero-filled region. Its length must be a non-zero
    /// multiple of [`RECORD_SIZE`]; any trailing partial slot is unusable.
    pub fn with_region(region: R) -> Result<Self, StoreError> {
        let len = region.bytes().len();
        let capacity = len / RECORD_SIZE;
        if capacity == 0 {
            return Err(StoreError::init("<memory>", format!("region of {len} bytes holds no slot"), None));
        }
        Ok(Self { region, capacity, cursor: 0, path: None })
    }

    /// Write `record` into the next free slot and return its index.
    ///
    /// Fails with [`StoreError::CapacityExceeded`] once all slots are used;
    /// the region is left untouched in that case.
    #[inline]
    pub fn append(&mut self, record: &Record) -> Result<usize, StoreError> {
        let index = self.cursor;
        if index >= self.capacity {
            return Err(StoreError::CapacityExceeded { capacity: self.capacity });
        }

        let start = index * RECORD_SIZE;
        let slot = self.region.bytes_mut()[start..]
            .first_chunk_mut::<RECORD_SIZE>()
            .ok_or(StoreError::CapacityExceeded { capacity: self.capacity })?;
        record.write_to(slot);

        self.cursor += 1;
        Ok(index)
    }

    /// Number of slots written so far.
    pub fn len(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.cursor
    }

    pub fn is_full(&self) -> bool {
        self.cursor >= self.capacity
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Raw view of the whole region, written and unwritten slots alike.
    pub fn as_bytes(&self) -> &[u8] {
        self.region.bytes()
    }

    /// Block until dirty pages are written back.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.region.flush().map_err(StoreError::Flush)
    }

    /// Ask the OS to start writing dirty pages back.
    pub fn flush_async(&self) -> Result<(), StoreError> {
        self.region.flush_async().map_err(StoreError::Flush)
    }

    /// Flush, unmap and release the backing file. Returns the number of used
    /// slots; the rest stay zeroed and read back as empty.
    pub fn close(self) -> Result<usize, StoreError> {
        self.flush()?;
        let used = self.cursor;
        match &self.path {
            Some(p) => info!("[store] closed {} ({used}/{} slots used)", p.display(), self.capacity),
            None => debug!("[store] closed in-memory region ({used}/{} slots used)", self.capacity),
        }
        Ok(used)
    }

    /// Release the store and hand back its region.
    pub fn into_region(self) -> R {
        self.region
    }
}
