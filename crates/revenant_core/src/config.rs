//! # Zone Configuration
//!
//! The zone size is decided once, by the embedding process, before anything
//! is loaded.
//!
//! ```toml
//! heap_mib = 16
//! min_heap_mib = 4
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ZoneError, ZoneResult};

/// Default zone size in MiB.
pub const DEFAULT_HEAP_MIB: usize = 16;

/// Smallest zone the auto-sizer will settle for, in MiB.
pub const MIN_HEAP_MIB: usize = 4;

/// Largest zone the host can address, in MiB.
pub const MAX_HEAP_MIB: usize = isize::MAX as usize / (1024 * 1024);

/// Zone sizing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ZoneConfig {
    /// Preferred zone size in MiB.
    pub heap_mib: usize,
    /// Smallest acceptable zone size in MiB when the preferred size cannot
    /// be obtained from the host.
    pub min_heap_mib: usize,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            heap_mib: DEFAULT_HEAP_MIB,
            min_heap_mib: MIN_HEAP_MIB,
        }
    }
}

impl ZoneConfig {
    /// Fixed-size config: no fallback to smaller zones.
    #[must_use]
    pub const fn fixed(heap_mib: usize) -> Self {
        Self {
            heap_mib,
            min_heap_mib: heap_mib,
        }
    }

    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError::InvalidConfig`] on a parse failure or if the
    /// values are inconsistent.
    pub fn from_toml_str(text: &str) -> ZoneResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ZoneError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError::InvalidConfig`] if the file cannot be read or
    /// parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> ZoneResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ZoneError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Checks the values for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError::InvalidConfig`] if a size is zero or above
    /// [`MAX_HEAP_MIB`], or the minimum exceeds the preferred size.
    pub fn validate(&self) -> ZoneResult<()> {
        if self.heap_mib == 0 || self.min_heap_mib == 0 {
            return Err(ZoneError::InvalidConfig(
                "heap sizes must be at least 1 MiB".to_string(),
            ));
        }
        if self.heap_mib > MAX_HEAP_MIB {
            return Err(ZoneError::InvalidConfig(format!(
                "heap_mib ({}) exceeds the addressable maximum ({MAX_HEAP_MIB})",
                self.heap_mib
            )));
        }
        if self.min_heap_mib > self.heap_mib {
            return Err(ZoneError::InvalidConfig(format!(
                "min_heap_mib ({}) exceeds heap_mib ({})",
                self.min_heap_mib, self.heap_mib
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ZoneConfig::default();
        assert_eq!(config.heap_mib, 16);
        assert_eq!(config.min_heap_mib, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = ZoneConfig::from_toml_str("heap_mib = 8").unwrap();
        assert_eq!(config.heap_mib, 8);
        assert_eq!(config.min_heap_mib, MIN_HEAP_MIB);
    }

    #[test]
    fn test_reject_inverted_sizes() {
        let err = ZoneConfig::from_toml_str("heap_mib = 2\nmin_heap_mib = 4").unwrap_err();
        assert!(matches!(err, ZoneError::InvalidConfig(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_reject_unaddressable_size() {
        let config = ZoneConfig::fixed(usize::MAX / 1024);
        assert!(matches!(config.validate(), Err(ZoneError::InvalidConfig(_))));

        let text = format!("heap_mib = {}", MAX_HEAP_MIB + 1);
        assert!(ZoneConfig::from_toml_str(&text).is_err());
        assert!(ZoneConfig::fixed(MAX_HEAP_MIB).validate().is_ok());
    }

    #[test]
    fn test_reject_unknown_keys() {
        assert!(ZoneConfig::from_toml_str("heap_megs = 8").is_err());
    }
}
