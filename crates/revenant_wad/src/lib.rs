//! # REVENANT WAD
//!
//! Named lumps from layered WAD files, cached in the zone on demand.
//!
//! ## Architecture Rules
//!
//! 1. **Later files win** - A name resolves to its newest entry, hashed or not
//! 2. **Zero copy when mapped** - Mapped files hand out slices, never zone blocks
//! 3. **Evicted means reloaded** - A purged lump is read again, never served stale
//!
//! ## Example
//!
//! ```rust
//! use revenant_core::{PurgeTag, Zone};
//! use revenant_wad::format::{build_wad, PWAD_MAGIC};
//! use revenant_wad::{LumpName, MemoryFile, WadDirectory};
//!
//! let image = build_wad(*PWAD_MAGIC, &[(LumpName::new("FLOOR"), b"tiles")]);
//!
//! let mut zone = Zone::new(64 * 1024).unwrap();
//! let mut wads = WadDirectory::default();
//! wads.add_backend("floor.wad", Box::new(MemoryFile::new(image))).unwrap();
//! wads.generate_hash_table();
//!
//! let lump = wads.cache_lump_name(&mut zone, "floor", PurgeTag::Static).unwrap();
//! assert_eq!(wads.lump_bytes(&zone, lump), Some(&b"tiles"[..]));
//! wads.release_lump_name(&mut zone, "FLOOR").unwrap();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod cache;
pub mod config;
pub mod directory;
pub mod error;
pub mod file;
pub mod format;
pub mod name;

pub use cache::{CacheStats, LumpRef};
pub use config::WadConfig;
pub use directory::{LumpInfo, WadDirectory};
pub use error::{WadError, WadResult};
pub use file::{open_file, FileClass, MappedFile, MemoryFile, StdcFile, WadFile, WadFileId};
pub use name::LumpName;
