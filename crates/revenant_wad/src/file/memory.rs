//! In-memory backend, for embedded data and tests.

use std::io;

use super::{copy_at, FileClass, WadFile};

/// A container held in an owned buffer.
///
/// Reads are copies, as with [`StdcFile`](super::StdcFile); the cache
/// stores its lumps in the zone.
#[derive(Clone, Debug, Default)]
pub struct MemoryFile {
    data: Vec<u8>,
}

impl MemoryFile {
    /// Wraps `data`.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl WadFile for MemoryFile {
    fn class(&self) -> FileClass {
        FileClass::Memory
    }

    fn length(&self) -> u64 {
        self.data.len() as u64
    }

    fn read(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        Ok(copy_at(&self.data, offset, buf))
    }
}
