//! # REVENANT Core
//!
//! Tagged zone memory: the heap every other REVENANT subsystem allocates
//! from.
//!
//! ## Architecture Rules
//!
//! 1. **One zone per process** - Sized once from config, never grown
//! 2. **Every block has a tag** - Bulk lifetimes are freed by tag range
//! 3. **No dangling reads** - Purged blocks empty their owner slot
//!
//! ## Example
//!
//! ```rust
//! use revenant_core::{PurgeTag, Zone, ZoneConfig};
//!
//! let mut zone = Zone::auto_alloc(&ZoneConfig::fixed(1)).unwrap();
//! let level = zone.malloc(4096, PurgeTag::Level, None).unwrap();
//! assert_eq!(zone.bytes(level).unwrap().len(), 4096);
//!
//! // Leaving the level frees everything level-scoped at once.
//! zone.free_tags(PurgeTag::Level, PurgeTag::LevSpec);
//! assert!(!zone.contains(level));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod memory;

pub use config::ZoneConfig;
pub use error::{ZoneError, ZoneResult};
pub use memory::{BlockInfo, OwnerSlot, PurgeTag, Zone, ZonePtr, ZoneStats};
