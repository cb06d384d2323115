//! # Purge Tags
//!
//! Every zone block carries exactly one tag. Tags are totally ordered so a
//! range `[low, high]` names a well-defined set of lifetimes.
//!
//! ```text
//! Static < Sound < Music < Free < Level < LevSpec < PurgeLevel < Cache
//! └──────── pinned ──────┘      └─ level ──────┘   └─ purgeable ──────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifetime class of a zone allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PurgeTag {
    /// Static for the entire execution time.
    Static = 1,
    /// Static while a sound is playing.
    Sound = 2,
    /// Static while music is playing.
    Music = 3,
    /// A free block. Never a valid allocation tag.
    Free = 4,
    /// Static until the level is exited.
    Level = 5,
    /// A special thinker in a level.
    LevSpec = 6,
    /// Purgeable whenever the zone needs the space.
    PurgeLevel = 7,
    /// Purgeable cache data (released lumps end up here).
    Cache = 8,
}

impl PurgeTag {
    /// All tags in ascending order.
    pub const ALL: [Self; 8] = [
        Self::Static,
        Self::Sound,
        Self::Music,
        Self::Free,
        Self::Level,
        Self::LevSpec,
        Self::PurgeLevel,
        Self::Cache,
    ];

    /// Returns `true` if the zone may evict blocks with this tag to satisfy
    /// an allocation.
    #[inline]
    #[must_use]
    pub const fn is_purgeable(self) -> bool {
        matches!(self, Self::PurgeLevel | Self::Cache)
    }

    /// Returns `true` for the free-block marker.
    #[inline]
    #[must_use]
    pub const fn is_free(self) -> bool {
        matches!(self, Self::Free)
    }

    /// Returns `true` if `self` lies in the inclusive range `[low, high]`.
    #[inline]
    #[must_use]
    pub fn in_range(self, low: Self, high: Self) -> bool {
        low <= self && self <= high
    }

    /// Converts from the raw on-heap value.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Static),
            2 => Some(Self::Sound),
            3 => Some(Self::Music),
            4 => Some(Self::Free),
            5 => Some(Self::Level),
            6 => Some(Self::LevSpec),
            7 => Some(Self::PurgeLevel),
            8 => Some(Self::Cache),
            _ => None,
        }
    }
}

impl fmt::Display for PurgeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Static => "static",
            Self::Sound => "sound",
            Self::Music => "music",
            Self::Free => "free",
            Self::Level => "level",
            Self::LevSpec => "levspec",
            Self::PurgeLevel => "purgelevel",
            Self::Cache => "cache",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_order() {
        for pair in PurgeTag::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(PurgeTag::from_u8(pair[0] as u8), Some(pair[0]));
        }
        assert_eq!(PurgeTag::from_u8(0), None);
        assert_eq!(PurgeTag::from_u8(9), None);
    }

    #[test]
    fn test_purgeable_threshold() {
        let purgeable: Vec<_> = PurgeTag::ALL.iter().filter(|t| t.is_purgeable()).collect();
        assert_eq!(purgeable, [&PurgeTag::PurgeLevel, &PurgeTag::Cache]);
        // Everything purgeable sorts above everything pinned.
        assert!(PurgeTag::ALL
            .iter()
            .filter(|t| !t.is_purgeable())
            .all(|t| *t < PurgeTag::PurgeLevel));
    }

    #[test]
    fn test_in_range() {
        assert!(PurgeTag::Level.in_range(PurgeTag::Level, PurgeTag::LevSpec));
        assert!(PurgeTag::LevSpec.in_range(PurgeTag::Level, PurgeTag::LevSpec));
        assert!(!PurgeTag::PurgeLevel.in_range(PurgeTag::Level, PurgeTag::LevSpec));
        assert!(!PurgeTag::Static.in_range(PurgeTag::Sound, PurgeTag::Cache));
    }
}
