//! # Resource Context
//!
//! The zone and the WAD directory, owned together by the embedding engine.
//!
//! ```text
//! startup(config)
//!   Zone::auto_alloc(zone)          one heap for the process
//!   add_file(f) for f in files      unopenable files are skipped
//!   generate_hash_table()           fails with NoLumps if nothing loaded
//!
//! per level
//!   cache_lump_name(.., Level)      level data
//!   cache_lump_name(.., Static)     kept until released
//!   release_lump_name(..)           back to the cache, purgeable
//!   end_level()                     frees [Level, LevSpec] in one sweep
//! ```

use revenant_core::{PurgeTag, Zone, ZoneResult};
use revenant_wad::{LumpRef, WadDirectory};
use tracing::{error, info};

use crate::config::RevenantConfig;
use crate::error::{ContextError, ContextResult};

/// Resource memory for one engine instance.
#[derive(Debug)]
pub struct ResourceContext {
    zone: Zone,
    wads: WadDirectory,
}

impl ResourceContext {
    /// Allocates the zone and loads every configured file.
    ///
    /// Files that cannot be opened are logged and skipped.
    ///
    /// # Errors
    ///
    /// - [`ContextError::InvalidConfig`] for inconsistent sizes.
    /// - [`ContextError::Zone`] if no acceptable zone can be allocated.
    /// - [`ContextError::Wad`] for a malformed file (fatal).
    /// - [`ContextError::NoLumps`] if nothing was loaded.
    pub fn startup(config: &RevenantConfig) -> ContextResult<Self> {
        config.validate()?;

        let zone = Zone::auto_alloc(&config.zone)?;
        let mut wads = WadDirectory::new(config.wad.clone());

        for path in &config.files {
            match wads.add_file(path) {
                Ok(_) => {}
                Err(e) if !e.is_fatal() => {}
                Err(e) => return Err(e.into()),
            }
        }

        Self::from_parts(zone, wads, config.files.len())
    }

    /// Wraps an existing zone and directory, building the hash table.
    ///
    /// `files_tried` is only reported in the error.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::NoLumps`] if `wads` is empty.
    pub fn from_parts(zone: Zone, mut wads: WadDirectory, files_tried: usize) -> ContextResult<Self> {
        if wads.num_lumps() == 0 {
            error!(files = files_tried, "no lumps loaded");
            return Err(ContextError::NoLumps { files: files_tried });
        }

        wads.generate_hash_table();
        info!(
            zone_bytes = zone.total_size(),
            files = wads.num_files(),
            lumps = wads.num_lumps(),
            "resource context ready"
        );

        Ok(Self { zone, wads })
    }

    /// The zone.
    #[inline]
    #[must_use]
    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    /// The zone, for direct allocations.
    #[inline]
    #[must_use]
    pub fn zone_mut(&mut self) -> &mut Zone {
        &mut self.zone
    }

    /// The directory.
    #[inline]
    #[must_use]
    pub fn wads(&self) -> &WadDirectory {
        &self.wads
    }

    /// Directory and zone, borrowed together for the cache methods.
    #[inline]
    #[must_use]
    pub fn parts_mut(&mut self) -> (&mut WadDirectory, &mut Zone) {
        (&mut self.wads, &mut self.zone)
    }

    /// Resolves a name that must exist.
    ///
    /// # Errors
    ///
    /// Fatal [`ContextError::Wad`] if the name is missing.
    pub fn get_num_for_name(&self, name: &str) -> ContextResult<usize> {
        Ok(self.wads.get_num_for_name(name)?)
    }

    /// Buffer size needed to load `lump`.
    ///
    /// # Errors
    ///
    /// Fatal [`ContextError::Wad`] for a bad index.
    pub fn lump_length(&self, lump: usize) -> ContextResult<u32> {
        Ok(self.wads.lump_length(lump)?)
    }

    /// Caches a lump by name and returns its bytes.
    ///
    /// The slice is valid until the next call that can allocate.
    ///
    /// # Errors
    ///
    /// Fatal [`ContextError::Wad`] if the name is missing, the zone is
    /// exhausted or the read is torn.
    pub fn cache_lump_name(&mut self, name: &str, tag: PurgeTag) -> ContextResult<&[u8]> {
        let lump = self.wads.get_num_for_name(name)?;
        self.cache_lump_num(lump, tag)
    }

    /// Caches a lump by index and returns its bytes.
    ///
    /// # Errors
    ///
    /// As [`cache_lump_name`](Self::cache_lump_name), plus a bad index.
    pub fn cache_lump_num(&mut self, lump: usize, tag: PurgeTag) -> ContextResult<&[u8]> {
        Ok(self.wads.cache_lump_bytes(&mut self.zone, lump, tag)?)
    }

    /// Caches a lump by name and returns a handle to re-resolve later.
    ///
    /// # Errors
    ///
    /// As [`cache_lump_name`](Self::cache_lump_name).
    pub fn cache_lump_ref(&mut self, name: &str, tag: PurgeTag) -> ContextResult<LumpRef> {
        Ok(self.wads.cache_lump_name(&mut self.zone, name, tag)?)
    }

    /// Resolves a handle; `None` if the payload was evicted.
    #[must_use]
    pub fn lump_bytes(&self, lump_ref: LumpRef) -> Option<&[u8]> {
        self.wads.lump_bytes(&self.zone, lump_ref)
    }

    /// Hands a lump back to the cache.
    ///
    /// # Errors
    ///
    /// Fatal [`ContextError::Wad`] if the name is missing.
    pub fn release_lump_name(&mut self, name: &str) -> ContextResult<()> {
        Ok(self.wads.release_lump_name(&mut self.zone, name)?)
    }

    /// Frees everything level-scoped: tags [`PurgeTag::Level`] through
    /// [`PurgeTag::LevSpec`]. Returns the number of blocks freed.
    pub fn end_level(&mut self) -> usize {
        let freed = self.zone.free_tags(PurgeTag::Level, PurgeTag::LevSpec);
        info!(freed, free_bytes = self.zone.free_bytes(), "level memory released");
        freed
    }

    /// Validates the zone.
    ///
    /// # Errors
    ///
    /// Returns [`revenant_core::ZoneError::Corrupted`] on any violation.
    pub fn check_heap(&self) -> ZoneResult<()> {
        self.zone.check_heap()
    }

    /// Closes every file and drops the zone.
    pub fn shutdown(self) {
        info!(stats = ?self.zone.stats(), cache = ?self.wads.cache_stats(), "shutting down");
        self.wads.close();
    }
}
