//! # Resource Configuration
//!
//! Everything [`ResourceContext::startup`](crate::ResourceContext::startup)
//! needs, in one TOML file:
//!
//! ```toml
//! files = ["doom2.wad", "mymod.wad", "d_runnin.mus"]
//!
//! [zone]
//! heap_mib = 16
//! min_heap_mib = 4
//!
//! [wad]
//! use_mmap = true
//! ```

use std::path::{Path, PathBuf};

use revenant_core::ZoneConfig;
use revenant_wad::WadConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ContextError, ContextResult};

/// Zone sizing, file backends and the ordered file list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RevenantConfig {
    /// Zone sizing.
    pub zone: ZoneConfig,
    /// File backend selection.
    pub wad: WadConfig,
    /// Files to load, in override order: later files win.
    pub files: Vec<PathBuf>,
}

impl RevenantConfig {
    /// Default sizing with the given files.
    #[must_use]
    pub fn with_files<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::InvalidConfig`] on a parse failure or
    /// inconsistent zone sizes.
    pub fn from_toml_str(text: &str) -> ContextResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ContextError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config from a TOML file.
    ///
    /// Relative file paths are kept as written, so they resolve against
    /// the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::InvalidConfig`] if the file cannot be read or
    /// parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> ContextResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ContextError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Checks the values for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::InvalidConfig`] if the zone sizes are
    /// inconsistent.
    pub fn validate(&self) -> ContextResult<()> {
        self.zone
            .validate()
            .map_err(|e| ContextError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let config = RevenantConfig::from_toml_str(
            r#"
            files = ["doom2.wad", "mymod.wad"]

            [zone]
            heap_mib = 8
            min_heap_mib = 2

            [wad]
            use_mmap = true
            "#,
        )
        .unwrap();

        assert_eq!(config.zone, ZoneConfig { heap_mib: 8, min_heap_mib: 2 });
        assert!(config.wad.use_mmap);
        assert_eq!(config.files, vec![PathBuf::from("doom2.wad"), PathBuf::from("mymod.wad")]);
    }

    #[test]
    fn test_sections_are_optional() {
        let config = RevenantConfig::from_toml_str(r#"files = ["a.wad"]"#).unwrap();
        assert_eq!(config, RevenantConfig::with_files(["a.wad"]));
    }

    #[test]
    fn test_bad_zone_sizes_rejected() {
        let err = RevenantConfig::from_toml_str("[zone]\nheap_mib = 0").unwrap_err();
        assert!(matches!(err, ContextError::InvalidConfig(_)));
        assert!(!err.is_fatal());
    }
}
