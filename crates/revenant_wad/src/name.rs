//! # Lump Names
//!
//! Lump names are at most eight bytes, compared case-insensitively. On disk
//! the field is not necessarily NUL-terminated, and bytes after the name
//! may be garbage.
//!
//! A [`LumpName`] is stored normalized: uppercased, cut at the first NUL,
//! trailing non-printable bytes zeroed. Equality and hashing work on the
//! normalized form.

use std::fmt;
use std::path::Path;

use tracing::warn;

/// Fixed width of a lump name.
pub const NAME_LEN: usize = 8;

/// A normalized, fixed-width lump name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LumpName([u8; NAME_LEN]);

impl LumpName {
    /// Builds a name from a string, keeping at most eight bytes.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut raw = [0u8; NAME_LEN];
        for (dst, src) in raw.iter_mut().zip(name.bytes()) {
            *dst = src;
        }
        Self::from_raw(raw)
    }

    /// Builds a name from an on-disk name field.
    #[must_use]
    pub fn from_raw(raw: [u8; NAME_LEN]) -> Self {
        let mut name = [0u8; NAME_LEN];
        let len = raw.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        for (dst, src) in name.iter_mut().zip(&raw[..len]) {
            *dst = src.to_ascii_uppercase();
        }
        // Trailing junk after the printable part is ignored.
        let printable = name[..len]
            .iter()
            .rposition(u8::is_ascii_graphic)
            .map_or(0, |i| i + 1);
        name[printable..].fill(0);
        Self(name)
    }

    /// Derives a single-lump name from a file path: the base name up to the
    /// first `.`, uppercased, truncated to eight bytes with a warning.
    #[must_use]
    pub fn from_file_base(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base = file_name.split('.').next().unwrap_or_default();

        let name = Self::new(base);
        if base.len() > NAME_LEN {
            warn!(file = %file_name, lump = %name, "truncated lump name");
        }
        name
    }

    /// Returns the significant bytes (no padding).
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        &self.0[..len]
    }

    /// Returns the padded on-disk form.
    #[inline]
    #[must_use]
    pub const fn to_raw(self) -> [u8; NAME_LEN] {
        self.0
    }

    /// Returns `true` for the empty name.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }

    /// Hash used by the directory's lookup table.
    ///
    /// djb2 with XOR, over at most eight uppercased bytes.
    #[must_use]
    pub fn name_hash(&self) -> u32 {
        self.as_bytes().iter().fold(5381u32, |result, &b| {
            ((result << 5) ^ result) ^ u32::from(b.to_ascii_uppercase())
        })
    }
}

impl fmt::Display for LumpName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in self.as_bytes() {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for LumpName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LumpName(\"{self}\")")
    }
}

impl From<&str> for LumpName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
