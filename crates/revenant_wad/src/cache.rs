//! # Lump Cache
//!
//! Loads lumps into the zone on demand and keeps them there until the zone
//! needs the space.
//!
//! ```text
//! cache_lump_num(lump, tag)
//!   file mapped?      -> LumpRef::Mapped (slice of the mapping, no copy)
//!   already resident? -> retag, LumpRef::Zone (same block as last time)
//!   otherwise         -> zone.malloc(size, tag, owner = lump slot)
//!                        read from the file, LumpRef::Zone
//! ```
//!
//! Releasing a lump retags it [`PurgeTag::Cache`]: it stays resident and a
//! later cache call reuses it without touching the file, unless an
//! allocation evicts it first. Eviction empties the lump's owner slot, so
//! the next cache call reads the file again.
//!
//! A [`LumpRef`] is only valid until the next call that can allocate from
//! the zone. Resolve it with [`WadDirectory::lump_bytes`]; `None` means the
//! payload was evicted.

use revenant_core::{PurgeTag, Zone, ZoneError, ZonePtr};
use tracing::{debug, error, trace};

use crate::directory::{read_exact_at, WadDirectory};
use crate::error::{WadError, WadResult};
use crate::file::WadFileId;

/// Where a cached lump's bytes live.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LumpRef {
    /// Inside a memory-mapped file.
    Mapped {
        /// Mapped file.
        file: WadFileId,
        /// Offset in the mapping.
        offset: usize,
        /// Length in bytes.
        len: usize,
    },
    /// In a zone block.
    Zone(ZonePtr),
}

/// Counters for cache behaviour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lumps read from a file into the zone.
    pub reads: u64,
    /// Cache calls served by a resident zone block.
    pub hits: u64,
    /// Cache calls served from a mapping.
    pub mapped_hits: u64,
}

impl WadDirectory {
    /// Returns the bytes of `lump`, loading them into the zone if needed.
    ///
    /// `tag` becomes the zone tag of the payload, also when it was already
    /// resident under another tag.
    ///
    /// # Errors
    ///
    /// - [`WadError::LumpOutOfRange`] for a bad index.
    /// - [`WadError::Zone`] if the zone cannot fit the lump even after
    ///   eviction, or `tag` is [`PurgeTag::Free`].
    /// - [`WadError::ShortRead`] / [`WadError::ReadFailed`] on a torn read.
    pub fn cache_lump_num(
        &mut self,
        zone: &mut Zone,
        lump: usize,
        tag: PurgeTag,
    ) -> WadResult<LumpRef> {
        let info = self.entry(lump)?;
        let (file, position, size) = (info.file, info.position, info.size as usize);

        if let Some(map) = self.files[file.index()].mapped() {
            let offset = position as usize;
            if offset.saturating_add(size) > map.len() {
                let read = map.len().saturating_sub(offset);
                error!(lump, read, expected = size, "lump runs past end of mapping");
                return Err(WadError::ShortRead {
                    lump,
                    read,
                    expected: size,
                });
            }
            self.stats.mapped_hits += 1;
            return Ok(LumpRef::Mapped {
                file,
                offset,
                len: size,
            });
        }

        if let Some(ptr) = info.cache.get() {
            zone.change_tag(ptr, tag)?;
            self.stats.hits += 1;
            trace!(lump, %tag, "lump cache hit");
            return Ok(LumpRef::Zone(ptr));
        }

        let ptr = zone.malloc(size, tag, Some(&info.cache))?;
        let loaded = match zone.bytes_mut(ptr) {
            Some(dest) => read_exact_at(self.files[file.index()].as_mut(), lump, position, dest),
            None => Err(ZoneError::InvalidPointer { bits: ptr.to_bits() }.into()),
        };
        if let Err(e) = loaded {
            zone.free(ptr)?;
            return Err(e);
        }

        self.stats.reads += 1;
        debug!(lump, name = %self.lumps[lump].name, size, %tag, "loaded lump");
        Ok(LumpRef::Zone(ptr))
    }

    /// [`cache_lump_num`](Self::cache_lump_num) by name.
    ///
    /// # Errors
    ///
    /// [`WadError::LumpNotFound`] if no lump has the name, otherwise as
    /// [`cache_lump_num`](Self::cache_lump_num).
    pub fn cache_lump_name(
        &mut self,
        zone: &mut Zone,
        name: &str,
        tag: PurgeTag,
    ) -> WadResult<LumpRef> {
        let lump = self.get_num_for_name(name)?;
        self.cache_lump_num(zone, lump, tag)
    }

    /// Caches `lump` and resolves it in one step.
    ///
    /// # Errors
    ///
    /// As [`cache_lump_num`](Self::cache_lump_num).
    pub fn cache_lump_bytes<'a>(
        &'a mut self,
        zone: &'a mut Zone,
        lump: usize,
        tag: PurgeTag,
    ) -> WadResult<&'a [u8]> {
        let lump_ref = self.cache_lump_num(zone, lump, tag)?;
        let this: &'a Self = self;
        let zone: &'a Zone = zone;
        this.lump_bytes(zone, lump_ref).ok_or(WadError::ShortRead {
            lump,
            read: 0,
            expected: this.lumps[lump].size as usize,
        })
    }

    /// Resolves a reference from an earlier cache call.
    ///
    /// Returns `None` if the payload has since been evicted or freed.
    #[must_use]
    pub fn lump_bytes<'a>(&'a self, zone: &'a Zone, lump_ref: LumpRef) -> Option<&'a [u8]> {
        match lump_ref {
            LumpRef::Mapped { file, offset, len } => self
                .files
                .get(file.index())?
                .mapped()?
                .get(offset..offset.checked_add(len)?),
            LumpRef::Zone(ptr) => zone.bytes(ptr),
        }
    }

    /// Hands `lump` back to the cache.
    ///
    /// A resident payload is retagged [`PurgeTag::Cache`] and may be
    /// evicted from then on. Mapped lumps and lumps that are not resident
    /// are left alone.
    ///
    /// # Errors
    ///
    /// [`WadError::LumpOutOfRange`] for a bad index.
    pub fn release_lump_num(&mut self, zone: &mut Zone, lump: usize) -> WadResult<()> {
        let info = self.entry(lump)?;

        if self.files[info.file.index()].mapped().is_some() {
            return Ok(());
        }

        match info.cache.get() {
            Some(ptr) => zone.change_tag(ptr, PurgeTag::Cache)?,
            None => debug!(lump, name = %info.name, "released lump is not resident"),
        }
        Ok(())
    }

    /// [`release_lump_num`](Self::release_lump_num) by name.
    ///
    /// # Errors
    ///
    /// [`WadError::LumpNotFound`] if no lump has the name.
    pub fn release_lump_name(&mut self, zone: &mut Zone, name: &str) -> WadResult<()> {
        let lump = self.get_num_for_name(name)?;
        self.release_lump_num(zone, lump)
    }

    /// Returns `true` if `lump` is resident in the zone.
    #[must_use]
    pub fn is_cached(&self, lump: usize) -> bool {
        self.lumps.get(lump).is_some_and(|l| l.is_cached())
    }

    /// Cache counters since the directory was created.
    #[inline]
    #[must_use]
    pub const fn cache_stats(&self) -> CacheStats {
        self.stats
    }
}
