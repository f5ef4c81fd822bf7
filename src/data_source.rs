// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Immutable byte-range data sources.
//!
//! Grounded on `examples/original_source/libbitpunch/src/api/data_source.c`:
//! the original distinguishes a memory-mapped file source (released via
//! `munmap`) from a heap-buffer source that is either owned (freed on
//! release) or borrowed (never freed). In safe Rust the owned/borrowed
//! split collapses naturally: both are just `Arc`-refcounted, and the
//! underlying storage is dropped exactly once its last reference goes away
//! (see the Open Question resolution in `DESIGN.md`).

use crate::error::{Error, Result};
use crate::slice::Slice;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

enum Origin {
    Mmap(Mmap),
    Memory(Slice),
}

struct Inner {
    origin: Origin,
}

/// An immutable reference to a contiguous byte range, shared by every box
/// and value that reads from it. Two producers: file-backed (memory-mapped)
/// and memory-backed.
#[derive(Clone)]
pub struct DataSource(Arc<Inner>);

impl DataSource {
    /// Memory-maps the file at `path` read-only.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the file cannot be opened or mapped.
    pub fn from_file_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_file(file)
    }

    /// Memory-maps an already-open file read-only.
    ///
    /// This is the idiomatic-Rust stand-in for the original's
    /// fd-based constructor: taking an owned [`File`] conveys the same
    /// ownership transfer without requiring `unsafe` to rebuild a `File`
    /// from a raw descriptor.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the file cannot be mapped.
    pub fn from_file(file: File) -> Result<Self> {
        let mmap = map_file(file)?;
        Ok(Self(Arc::new(Inner {
            origin: Origin::Mmap(mmap),
        })))
    }

    /// Wraps an in-memory buffer. The buffer is retained for as long as any
    /// clone of the returned `DataSource` (or any value read from it) is
    /// alive.
    #[must_use]
    pub fn from_memory(data: impl Into<Slice>) -> Self {
        Self(Arc::new(Inner {
            origin: Origin::Memory(data.into()),
        }))
    }

    /// The number of bytes in this data source.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns `true` if the data source is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrows the full backing byte range.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.0.origin {
            Origin::Mmap(m) => m.as_ref(),
            Origin::Memory(s) => s.as_ref(),
        }
    }

    /// Borrows a sub-range `[start, end)`.
    ///
    /// # Panics
    ///
    /// Panics if `start > end` or `end` is out of bounds -- callers must
    /// only invoke this with offsets already validated by the offset
    /// resolution algebra.
    #[must_use]
    pub fn slice(&self, start: u64, end: u64) -> &[u8] {
        let bytes = self.as_bytes();
        #[allow(clippy::cast_possible_truncation)]
        &bytes[start as usize..end as usize]
    }

    /// Returns `true` if both `DataSource`s point at the same underlying
    /// allocation (used for `Overlay` equality checks).
    #[must_use]
    pub fn same_origin(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSource").field("len", &self.len()).finish()
    }
}

/// `Mmap::map` is `unsafe`: the caller must guarantee the file is not
/// mutated by another process for the mapping's lifetime. This crate
/// accepts that contract as part of adopting a read-only, externally owned
/// data file, exactly as the original's `mmap`-based source does -- it is
/// the one deliberate exception to an otherwise safe-Rust codebase.
fn map_file(file: File) -> Result<Mmap> {
    let mmap = unsafe { Mmap::map(&file)? };
    drop(file);
    Ok(mmap)
}
