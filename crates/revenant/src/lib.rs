//! # REVENANT
//!
//! Resource memory for a classic engine: one tagged zone, one merged WAD
//! directory, lumps cached between them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      ResourceContext                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌──────────────────────┐        ┌──────────────────────┐    │
//! │  │   revenant_wad       │        │   revenant_core      │    │
//! │  │                      │ malloc │                      │    │
//! │  │  • WadDirectory      │───────>│  • Zone              │    │
//! │  │  • Lump cache        │        │  • PurgeTag          │    │
//! │  │  • File backends     │<───────│  • OwnerSlot         │    │
//! │  │                      │ evict  │                      │    │
//! │  └──────────────────────┘        └──────────────────────┘    │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: the TOML startup config
//! - `context`: [`ResourceContext`]
//! - `error`: [`ContextError`]

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod context;
pub mod error;

pub use config::RevenantConfig;
pub use context::ResourceContext;
pub use error::{ContextError, ContextResult};

/// Re-export of the zone crate.
pub use revenant_core as core;

/// Re-export of the WAD crate.
pub use revenant_wad as wad;
