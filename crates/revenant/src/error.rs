//! # Context Error Types

use revenant_core::ZoneError;
use revenant_wad::WadError;
use thiserror::Error;

/// Errors from building or driving a [`ResourceContext`](crate::ResourceContext).
#[derive(Error, Debug)]
pub enum ContextError {
    /// Zone failure.
    #[error(transparent)]
    Zone(#[from] ZoneError),

    /// Directory or cache failure.
    #[error(transparent)]
    Wad(#[from] WadError),

    /// None of the configured files could be loaded.
    #[error("no lumps loaded from {files} configured file(s)")]
    NoLumps {
        /// Number of files that were tried.
        files: usize,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ContextError {
    /// Returns `true` if the embedding process must terminate.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Zone(inner) => inner.is_fatal(),
            Self::Wad(inner) => inner.is_fatal(),
            Self::NoLumps { .. } => true,
            Self::InvalidConfig(_) => false,
        }
    }
}

/// Result type for context operations.
pub type ContextResult<T> = Result<T, ContextError>;
