//! # Zone Error Types
//!
//! All errors that can occur in zone memory.

use thiserror::Error;

use crate::memory::PurgeTag;

/// Errors that can occur in zone memory.
///
/// Apart from configuration problems these are fatal: the zone underlies
/// every other subsystem and the embedding process must stop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZoneError {
    /// The host could not provide the zone's backing memory.
    #[error("unable to allocate {size} bytes of memory for zone")]
    HostAllocation {
        /// Bytes requested from the host.
        size: usize,
    },

    /// The requested zone cannot hold even one block.
    #[error("zone size {size} is below the minimum of {minimum} bytes")]
    HeapTooSmall {
        /// Requested size.
        size: usize,
        /// Smallest usable size.
        minimum: usize,
    },

    /// No span large enough exists even after purging every purgeable block.
    #[error("failed on allocation of {requested} bytes ({free} bytes free, largest span {largest})")]
    OutOfMemory {
        /// Bytes requested.
        requested: usize,
        /// Free bytes after eviction.
        free: usize,
        /// Largest contiguous free span after eviction.
        largest: usize,
    },

    /// Attempted to allocate or retag a block with an illegal tag.
    #[error("attempted to use invalid tag {0} for an allocated block")]
    InvalidTag(PurgeTag),

    /// Purgeable blocks must have an owner slot the zone can clear.
    #[error("an owner is required for purgeable blocks (tag {0})")]
    OwnerRequired(PurgeTag),

    /// The pointer does not name a live block (freed, purged or foreign).
    #[error("pointer {bits:#018x} does not refer to a live zone block")]
    InvalidPointer {
        /// Packed handle value.
        bits: u64,
    },

    /// The block chain failed an integrity check.
    #[error("heap corrupted at offset {offset}: {reason}")]
    Corrupted {
        /// Zone offset of the offending block.
        offset: usize,
        /// What was wrong.
        reason: String,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ZoneError {
    /// Returns `true` if the embedding process must terminate.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidConfig(_))
    }
}

/// Result type for zone operations.
pub type ZoneResult<T> = Result<T, ZoneError>;
