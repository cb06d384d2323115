//! # Zone Pointers
//!
//! A zone pointer is a lightweight handle consisting of:
//! - A block slot index
//! - A generation counter, bumped every time the slot is reused
//!
//! A handle whose generation no longer matches its slot is stale. The zone
//! rejects it instead of handing out someone else's bytes.

use std::fmt;

/// Handle to a live zone allocation.
///
/// The ID is split into two parts:
/// - Lower 32 bits: Block slot index
/// - Upper 32 bits: Generation counter for detecting stale references
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ZonePtr(u64);

impl ZonePtr {
    /// Creates a handle from slot index and generation.
    #[inline]
    #[must_use]
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (slot as u64))
    }

    /// Returns the slot portion of the handle.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the handle.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Returns the packed representation.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ZonePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ZonePtr({}v{})", self.slot(), self.generation())
    }
}
