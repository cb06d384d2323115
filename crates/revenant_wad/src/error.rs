//! # WAD Error Types
//!
//! All errors that can occur while loading and caching lumps.

use std::io;
use std::path::PathBuf;

use revenant_core::ZoneError;
use thiserror::Error;

/// Errors that can occur in the WAD layer.
#[derive(Error, Debug)]
pub enum WadError {
    /// The file could not be opened. The engine may continue without it.
    #[error("couldn't open {}: {source}", path.display())]
    Open {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A `.wad` file without an `IWAD` or `PWAD` identification.
    #[error("wad file {} doesn't have IWAD or PWAD id (found {found:?})", path.display())]
    BadMagic {
        /// Offending file.
        path: PathBuf,
        /// The four bytes found instead.
        found: [u8; 4],
    },

    /// The header or lump table could not be read in full.
    #[error("wad file {} is truncated: read {read} of {expected} directory bytes", path.display())]
    TruncatedDirectory {
        /// Offending file.
        path: PathBuf,
        /// Bytes the header promised.
        expected: usize,
        /// Bytes actually read.
        read: usize,
    },

    /// The backend failed while the header or lump table was being read.
    #[error("couldn't read directory of {}: {source}", path.display())]
    DirectoryRead {
        /// Offending file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A single-lump file whose size does not fit the 32-bit lump length.
    #[error("{} is too large for a lump ({size} bytes)", path.display())]
    LumpTooLarge {
        /// Offending file.
        path: PathBuf,
        /// File length.
        size: u64,
    },

    /// A required lump is missing.
    #[error("{name} not found")]
    LumpNotFound {
        /// Name that was looked up.
        name: String,
    },

    /// Lump index past the end of the directory.
    #[error("lump {lump} >= numlumps ({numlumps})")]
    LumpOutOfRange {
        /// Requested index.
        lump: usize,
        /// Directory size.
        numlumps: usize,
    },

    /// Fewer bytes came back than the directory promised.
    #[error("only read {read} of {expected} bytes on lump {lump}")]
    ShortRead {
        /// Lump being read.
        lump: usize,
        /// Bytes read.
        read: usize,
        /// Lump size.
        expected: usize,
    },

    /// The backend reported an I/O error mid-read.
    #[error("read of lump {lump} failed: {source}")]
    ReadFailed {
        /// Lump being read.
        lump: usize,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Destination buffer cannot hold the lump.
    #[error("buffer of {provided} bytes too small for lump {lump} ({needed} bytes)")]
    BufferTooSmall {
        /// Lump being read.
        lump: usize,
        /// Lump size.
        needed: usize,
        /// Buffer size.
        provided: usize,
    },

    /// Zone failure while caching.
    #[error(transparent)]
    Zone(#[from] ZoneError),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl WadError {
    /// Returns `true` if the embedding process must terminate.
    ///
    /// Only a missing file and a bad config are survivable; everything else
    /// means a torn asset or a corrupted heap.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Open { .. } | Self::InvalidConfig(_) => false,
            Self::Zone(inner) => inner.is_fatal(),
            _ => true,
        }
    }
}

/// Result type for WAD operations.
pub type WadResult<T> = Result<T, WadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let open = WadError::Open {
            path: PathBuf::from("missing.wad"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(!open.is_fatal());
        assert!(!WadError::InvalidConfig("x".into()).is_fatal());

        let range = WadError::LumpOutOfRange { lump: 99_999, numlumps: 10 };
        assert!(range.is_fatal());
        assert_eq!(range.to_string(), "lump 99999 >= numlumps (10)");

        assert!(WadError::from(ZoneError::InvalidPointer { bits: 0 }).is_fatal());
        assert!(!WadError::from(ZoneError::InvalidConfig("y".into())).is_fatal());
    }
}
