//! # Memory Management
//!
//! The zone: one pre-allocated region, subdivided into tagged blocks.
//!
//! ## Design Philosophy
//!
//! All memory is allocated once at startup. During play:
//! - Lifetimes are expressed as tags, not as individual frees
//! - Purgeable data is evicted only when space is needed
//! - Evicted data leaves an empty owner slot behind, never a dangling one

mod owner;
mod ptr;
mod tag;
mod zone;

pub use owner::OwnerSlot;
pub use ptr::ZonePtr;
pub use tag::PurgeTag;
pub use zone::{BlockInfo, Zone, ZoneStats, ALIGNMENT, MIN_FRAGMENT};
