//! # WAD Configuration
//!
//! ```toml
//! use_mmap = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{WadError, WadResult};

/// How WAD files are opened.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WadConfig {
    /// Map files into memory and serve lumps straight from the mapping.
    /// Falls back to buffered reads if mapping fails.
    pub use_mmap: bool,
}

impl WadConfig {
    /// Config with memory mapping enabled.
    #[must_use]
    pub const fn mapped() -> Self {
        Self { use_mmap: true }
    }

    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`WadError::InvalidConfig`] on a parse failure.
    pub fn from_toml_str(text: &str) -> WadResult<Self> {
        toml::from_str(text).map_err(|e| WadError::InvalidConfig(e.to_string()))
    }

    /// Loads a config from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`WadError::InvalidConfig`] if the file cannot be read or
    /// parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> WadResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| WadError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
