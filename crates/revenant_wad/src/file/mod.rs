//! # File Backends
//!
//! A [`WadFile`] is an open container the directory reads from. There are
//! three backends:
//!
//! | Backend | Storage | `mapped()` |
//! |---------|---------|------------|
//! | [`StdcFile`] | `std::fs::File`, seek + read | `None` |
//! | [`MappedFile`] | read-only `memmap2::Mmap` | whole file |
//! | [`MemoryFile`] | owned `Vec<u8>` | `None` |
//!
//! When a backend exposes a mapping, the cache hands out slices of it
//! instead of copying lumps into the zone.

mod mapped;
mod memory;
mod stdc;

use std::fmt;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::config::WadConfig;
use crate::error::{WadError, WadResult};

pub use mapped::MappedFile;
pub use memory::MemoryFile;
pub use stdc::StdcFile;

/// Which backend serves a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileClass {
    /// Buffered reads through the standard library.
    Stdc,
    /// Memory-mapped.
    Mapped,
    /// In-memory buffer.
    Memory,
}

impl fmt::Display for FileClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stdc => "stdc",
            Self::Mapped => "mapped",
            Self::Memory => "memory",
        };
        f.write_str(name)
    }
}

/// Index of an open file in load order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WadFileId(u32);

impl WadFileId {
    /// Wraps a load-order index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Load-order index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// An open, read-only container.
pub trait WadFile {
    /// Backend serving this file.
    fn class(&self) -> FileClass;

    /// File length in bytes.
    fn length(&self) -> u64;

    /// The whole file, if it is addressable in memory without copying.
    fn mapped(&self) -> Option<&[u8]> {
        None
    }

    /// Reads up to `buf.len()` bytes at `offset`.
    ///
    /// Returns the number of bytes read, which is short only at end of
    /// file.
    ///
    /// # Errors
    ///
    /// Any I/O error other than end of file.
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Releases the backend.
    fn close(self: Box<Self>) {}
}

/// Opens `path` with the backends `config` allows.
///
/// With `use_mmap` the mapped backend is tried first and the buffered one
/// second; otherwise only the buffered backend is used.
///
/// # Errors
///
/// Returns [`WadError::Open`] if no backend could open the file.
pub fn open_file(path: &Path, config: &WadConfig) -> WadResult<Box<dyn WadFile>> {
    if config.use_mmap {
        match MappedFile::open(path) {
            Ok(file) => return Ok(Box::new(file)),
            Err(e) => debug!(path = %path.display(), error = %e, "mmap failed, falling back"),
        }
    }

    StdcFile::open(path)
        .map(|file| Box::new(file) as Box<dyn WadFile>)
        .map_err(|source| WadError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Copies out of `data` at `offset`, as far as it goes.
fn copy_at(data: &[u8], offset: u64, buf: &mut [u8]) -> usize {
    let start = usize::try_from(offset).map_or(data.len(), |o| o.min(data.len()));
    let count = buf.len().min(data.len() - start);
    buf[..count].copy_from_slice(&data[start..start + count]);
    count
}
