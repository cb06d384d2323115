//! Memory-mapped backend.

// SAFETY: Mapping a file is unsafe because another process could truncate
// or rewrite it while mapped. WADs are opened read-only and never modified
// while the engine runs.
#![allow(unsafe_code)]

use std::fs::File;
use std::io;
use std::path::Path;

use memmap2::Mmap;

use super::{copy_at, FileClass, WadFile};

/// A WAD file mapped read-only into the address space.
#[derive(Debug)]
pub struct MappedFile {
    map: Mmap,
}

impl MappedFile {
    /// Maps `path` read-only.
    ///
    /// # Errors
    ///
    /// Any I/O error from opening or mapping the file.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        // SAFETY: see module header. The mapping outlives `file`, which
        // memmap2 allows.
        let map = unsafe { Mmap::map(&file)? };
        Ok(Self { map })
    }
}

impl WadFile for MappedFile {
    fn class(&self) -> FileClass {
        FileClass::Mapped
    }

    fn length(&self) -> u64 {
        self.map.len() as u64
    }

    fn mapped(&self) -> Option<&[u8]> {
        Some(&self.map[..])
    }

    fn read(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        Ok(copy_at(&self.map, offset, buf))
    }
}
