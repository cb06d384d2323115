//! # Zone Allocator
//!
//! One region, allocated once at startup, carved into blocks that each carry
//! a [`PurgeTag`].
//!
//! ## Layout
//!
//! ```text
//! offset 0                                                        total
//! ├──────────┬──────┬────────────────┬──────┬─────────────────────┤
//! │ STATIC   │ FREE │ CACHE (lump)   │ LEVEL│ FREE                │
//! └──────────┴──────┴────────────────┴──────┴─────────────────────┘
//!   head ──next──> ... ──next──> tail          (prev links mirror)
//! ```
//!
//! Blocks are kept in a doubly linked chain ordered by address. The chain
//! always covers the whole region, so block sizes sum to the zone size, and
//! two free blocks are never adjacent.
//!
//! ## Allocation
//!
//! - First fit over the chain, in address order.
//! - If nothing fits, an eviction pass walks the chain from the start and
//!   frees every purgeable block, coalescing as it goes, until a large
//!   enough span appears. If the whole chain is scanned without success the
//!   allocation fails with [`ZoneError::OutOfMemory`].
//! - Returned memory is always zero-filled.
//!
//! Block metadata lives beside the region, not inside it. The guard value
//! each block carries is checked by [`Zone::check_heap`].

use std::io::{self, Write};

use tracing::{debug, error, info, trace, warn};

use super::owner::{OwnerSlot, WeakOwner};
use super::ptr::ZonePtr;
use super::tag::PurgeTag;
use crate::config::ZoneConfig;
use crate::error::{ZoneError, ZoneResult};

/// Guard value stored in every linked block.
const ZONE_ID: u32 = 0x001d_4a11;

/// Allocation granularity in bytes.
pub const ALIGNMENT: usize = 8;

/// Leftovers smaller than this stay attached to the allocated block instead
/// of becoming a free block of their own.
pub const MIN_FRAGMENT: usize = 64;

const MIB: usize = 1024 * 1024;

/// Block metadata.
#[derive(Debug)]
struct MemBlock {
    /// `ZONE_ID` while linked into the chain, 0 while the slot is spare.
    id: u32,
    /// Start of the block within the region.
    offset: usize,
    /// Span in bytes, including padding.
    size: usize,
    /// Bytes the caller asked for.
    requested: usize,
    tag: PurgeTag,
    owner: Option<WeakOwner>,
    /// Bumped on every allocation and every retirement of this slot.
    generation: u32,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Snapshot of one block, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Start of the block within the zone.
    pub offset: usize,
    /// Span in bytes, including padding.
    pub size: usize,
    /// Payload bytes requested by the caller (0 for free blocks).
    pub requested: usize,
    /// The block's tag.
    pub tag: PurgeTag,
    /// Whether an owner slot is still attached.
    pub has_owner: bool,
}

/// Zone counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ZoneStats {
    /// Successful allocations.
    pub allocations: u64,
    /// Explicit frees.
    pub frees: u64,
    /// Blocks freed by eviction passes or tag-range purges.
    pub purged: u64,
    /// Eviction passes started because first fit failed.
    pub eviction_passes: u64,
    /// Tag changes on live blocks.
    pub tag_changes: u64,
}

/// The tagged zone heap.
///
/// # Thread Safety
///
/// The zone is NOT thread-safe and is not `Send`: owner slots are `Rc`s.
///
/// # Example
///
/// ```rust
/// use revenant_core::{OwnerSlot, PurgeTag, Zone};
///
/// let mut zone = Zone::new(64 * 1024).unwrap();
/// let owner = OwnerSlot::new();
///
/// let ptr = zone.malloc(1000, PurgeTag::Cache, Some(&owner)).unwrap();
/// assert_eq!(owner.get(), Some(ptr));
///
/// zone.free_tags(PurgeTag::PurgeLevel, PurgeTag::Cache);
/// assert!(!owner.is_set());
/// ```
pub struct Zone {
    /// The region itself.
    memory: Box<[u8]>,
    /// Block slots, linked and spare.
    blocks: Vec<MemBlock>,
    /// Retired slots available for reuse.
    spare: Vec<usize>,
    /// Slot of the block at offset 0. Merges always keep the lower block,
    /// so this never changes.
    head: usize,
    stats: ZoneStats,
}

impl std::fmt::Debug for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Zone")
            .field("size", &self.total_size())
            .field("free", &self.free_bytes())
            .field("blocks", &self.block_count())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Zone {
    /// Creates a zone of `size` bytes (rounded down to [`ALIGNMENT`]), all of
    /// it one free block.
    ///
    /// # Errors
    ///
    /// - [`ZoneError::HeapTooSmall`] if `size` is below [`MIN_FRAGMENT`].
    /// - [`ZoneError::HostAllocation`] if the host refuses the memory.
    pub fn new(size: usize) -> ZoneResult<Self> {
        if size < MIN_FRAGMENT {
            return Err(ZoneError::HeapTooSmall {
                size,
                minimum: MIN_FRAGMENT,
            });
        }
        let size = size & !(ALIGNMENT - 1);

        let mut storage = Vec::new();
        if storage.try_reserve_exact(size).is_err() {
            error!(size, "unable to allocate zone memory");
            return Err(ZoneError::HostAllocation { size });
        }
        storage.resize(size, 0u8);

        let head = MemBlock {
            id: ZONE_ID,
            offset: 0,
            size,
            requested: 0,
            tag: PurgeTag::Free,
            owner: None,
            generation: 0,
            prev: None,
            next: None,
        };

        info!(size, "zone memory allocated");

        Ok(Self {
            memory: storage.into_boxed_slice(),
            blocks: vec![head],
            spare: Vec::new(),
            head: 0,
            stats: ZoneStats::default(),
        })
    }

    /// Creates a zone sized from config, trying progressively smaller sizes
    /// (1 MiB steps) down to `min_heap_mib` until the host grants one.
    ///
    /// # Errors
    ///
    /// - [`ZoneError::InvalidConfig`] if the config is inconsistent.
    /// - [`ZoneError::HostAllocation`] if not even the minimum is available.
    pub fn auto_alloc(config: &ZoneConfig) -> ZoneResult<Self> {
        config.validate()?;

        let mut mib = config.heap_mib;
        loop {
            let Some(size) = mib.checked_mul(MIB) else {
                return Err(ZoneError::InvalidConfig(format!(
                    "heap of {mib} MiB overflows the address space"
                )));
            };
            match Self::new(size) {
                Ok(zone) => return Ok(zone),
                Err(ZoneError::HostAllocation { .. }) if mib > config.min_heap_mib => {
                    mib = Self::next_attempt(mib, config.min_heap_mib);
                    warn!(mib, "zone allocation refused, retrying smaller");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Next size to try after `mib` was refused: 1 MiB less for small
    /// zones, an eighth less for large ones, never below `min`.
    fn next_attempt(mib: usize, min: usize) -> usize {
        let step = (mib / 8).max(1);
        mib.saturating_sub(step).max(min)
    }

    /// Returns the total zone size in bytes.
    #[inline]
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.memory.len()
    }

    /// Returns the bytes held by free blocks.
    #[must_use]
    pub fn free_bytes(&self) -> usize {
        self.sum_where(|b| b.tag.is_free())
    }

    /// Returns the bytes held by purgeable blocks, i.e. what an eviction
    /// pass could reclaim.
    #[must_use]
    pub fn purgeable_bytes(&self) -> usize {
        self.sum_where(|b| b.tag.is_purgeable())
    }

    /// Returns the bytes held by allocated blocks of any tag.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.total_size() - self.free_bytes()
    }

    /// Returns the size of the largest free block.
    #[must_use]
    pub fn largest_free(&self) -> usize {
        self.chain()
            .map(|i| &self.blocks[i])
            .filter(|b| b.tag.is_free())
            .map(|b| b.size)
            .max()
            .unwrap_or(0)
    }

    /// Returns the number of blocks in the chain.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.chain().count()
    }

    /// Returns the zone counters.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> ZoneStats {
        self.stats
    }

    /// Allocates `size` zero-filled bytes under `tag`.
    ///
    /// If `owner` is given it is set to the returned pointer now, and emptied
    /// when the block is freed or purged. Purgeable tags require an owner.
    ///
    /// # Errors
    ///
    /// - [`ZoneError::InvalidTag`] for [`PurgeTag::Free`].
    /// - [`ZoneError::OwnerRequired`] for a purgeable tag without owner.
    /// - [`ZoneError::OutOfMemory`] if no span fits even after eviction.
    pub fn malloc(
        &mut self,
        size: usize,
        tag: PurgeTag,
        owner: Option<&OwnerSlot>,
    ) -> ZoneResult<ZonePtr> {
        if tag.is_free() {
            error!(%tag, "attempted to allocate a block with an invalid tag");
            return Err(ZoneError::InvalidTag(tag));
        }
        if owner.is_none() && tag.is_purgeable() {
            error!(%tag, "an owner is required for purgeable blocks");
            return Err(ZoneError::OwnerRequired(tag));
        }

        let Some(span) = Self::span_for(size) else {
            return Err(self.out_of_memory(size));
        };

        let index = match self.first_fit(span) {
            Some(index) => index,
            None => match self.evict_for(span) {
                Some(index) => index,
                None => return Err(self.out_of_memory(size)),
            },
        };

        self.carve(index, span);

        let block = &mut self.blocks[index];
        block.tag = tag;
        block.requested = size;
        block.generation = block.generation.wrapping_add(1);
        block.owner = owner.map(OwnerSlot::downgrade);
        let ptr = ZonePtr::new(index as u32, block.generation);
        let (start, end) = (block.offset, block.offset + block.size);

        self.memory[start..end].fill(0);

        if let Some(owner) = owner {
            owner.set(ptr);
        }

        self.stats.allocations += 1;
        trace!(size, %tag, offset = start, ?ptr, "zone allocation");

        Ok(ptr)
    }

    /// Frees a block, emptying its owner slot and coalescing with free
    /// neighbours.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError::InvalidPointer`] if `ptr` is stale or foreign.
    pub fn free(&mut self, ptr: ZonePtr) -> ZoneResult<()> {
        let index = self.lookup(ptr)?;
        self.release(index);
        self.stats.frees += 1;
        trace!(?ptr, "zone free");
        Ok(())
    }

    /// Moves a live block to another tag without moving its bytes.
    ///
    /// # Errors
    ///
    /// - [`ZoneError::InvalidPointer`] if `ptr` is stale or foreign.
    /// - [`ZoneError::InvalidTag`] for [`PurgeTag::Free`].
    /// - [`ZoneError::OwnerRequired`] when making an ownerless block
    ///   purgeable.
    pub fn change_tag(&mut self, ptr: ZonePtr, tag: PurgeTag) -> ZoneResult<()> {
        let index = self.lookup(ptr)?;
        if tag.is_free() {
            error!(?ptr, "change_tag: cannot retag a live block as free");
            return Err(ZoneError::InvalidTag(tag));
        }

        let block = &mut self.blocks[index];
        let owned = block.owner.as_ref().is_some_and(|o| !o.is_detached());
        if tag.is_purgeable() && !owned {
            error!(?ptr, %tag, "change_tag: an owner is required for purgeable blocks");
            return Err(ZoneError::OwnerRequired(tag));
        }

        block.tag = tag;
        self.stats.tag_changes += 1;
        Ok(())
    }

    /// Frees every allocated block whose tag lies in `[low, high]`, in
    /// address order. Returns the number of blocks freed.
    pub fn free_tags(&mut self, low: PurgeTag, high: PurgeTag) -> usize {
        let mut freed = 0usize;
        let mut cursor = Some(self.head);

        while let Some(mut index) = cursor {
            let tag = self.blocks[index].tag;
            if !tag.is_free() && tag.in_range(low, high) {
                index = self.release(index);
                freed += 1;
            }
            cursor = self.blocks[index].next;
        }

        self.stats.purged += freed as u64;
        debug!(%low, %high, freed, "freed tag range");
        freed
    }

    /// Walks the chain and validates every block.
    ///
    /// Checks the guard value, back links, address contiguity, that no two
    /// free blocks touch, that purgeable blocks have an owner, and that the
    /// sizes sum to the zone size.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError::Corrupted`] describing the first fault found.
    pub fn check_heap(&self) -> ZoneResult<()> {
        let mut expected = 0usize;
        let mut prev: Option<usize> = None;
        let mut cursor = Some(self.head);
        let mut steps = 0usize;

        while let Some(index) = cursor {
            let Some(block) = self.blocks.get(index) else {
                return Err(Self::corrupted(expected, "block link points outside the block table"));
            };

            steps += 1;
            if steps > self.blocks.len() {
                return Err(Self::corrupted(block.offset, "block chain contains a cycle"));
            }
            if block.id != ZONE_ID {
                return Err(Self::corrupted(block.offset, "block without a ZONEID"));
            }
            if block.prev != prev {
                return Err(Self::corrupted(block.offset, "doubly-linked list corrupted"));
            }
            if block.offset != expected {
                return Err(Self::corrupted(
                    block.offset,
                    "block size does not touch the next block",
                ));
            }
            if block.size == 0 || block.size % ALIGNMENT != 0 {
                return Err(Self::corrupted(block.offset, "block size is not a positive multiple of the alignment"));
            }
            if block.requested > block.size {
                return Err(Self::corrupted(block.offset, "payload larger than its block"));
            }
            if block.tag.is_purgeable() && block.owner.is_none() {
                return Err(Self::corrupted(block.offset, "purgeable block without an owner"));
            }
            if block.tag.is_free() && prev.is_some_and(|p| self.blocks[p].tag.is_free()) {
                return Err(Self::corrupted(block.offset, "two consecutive free blocks"));
            }

            expected = block.offset + block.size;
            prev = Some(index);
            cursor = block.next;
        }

        if expected != self.total_size() {
            return Err(Self::corrupted(
                expected,
                format!("block sizes sum to {expected}, zone holds {}", self.total_size()),
            ));
        }

        Ok(())
    }

    /// Returns the payload of a live block.
    #[must_use]
    pub fn bytes(&self, ptr: ZonePtr) -> Option<&[u8]> {
        let block = &self.blocks[self.lookup(ptr).ok()?];
        Some(&self.memory[block.offset..block.offset + block.requested])
    }

    /// Returns the payload of a live block, mutably.
    #[must_use]
    pub fn bytes_mut(&mut self, ptr: ZonePtr) -> Option<&mut [u8]> {
        let index = self.lookup(ptr).ok()?;
        let (start, len) = (self.blocks[index].offset, self.blocks[index].requested);
        Some(&mut self.memory[start..start + len])
    }

    /// Returns the tag of a live block.
    #[must_use]
    pub fn tag_of(&self, ptr: ZonePtr) -> Option<PurgeTag> {
        self.lookup(ptr).ok().map(|i| self.blocks[i].tag)
    }

    /// Returns `true` if `ptr` names a live block.
    #[must_use]
    pub fn contains(&self, ptr: ZonePtr) -> bool {
        self.lookup(ptr).is_ok()
    }

    /// Iterates over all blocks in address order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
        self.chain().map(|i| self.info(i))
    }

    /// Returns the blocks whose tag lies in `[low, high]`.
    #[must_use]
    pub fn dump_heap(&self, low: PurgeTag, high: PurgeTag) -> Vec<BlockInfo> {
        self.blocks().filter(|b| b.tag.in_range(low, high)).collect()
    }

    /// Writes a human-readable listing of the chain, flagging linkage faults
    /// inline.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn write_heap_dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "zone size: {}  free: {}  purgeable: {}  blocks: {}",
            self.total_size(),
            self.free_bytes(),
            self.purgeable_bytes(),
            self.block_count()
        )?;

        for index in self.chain() {
            let block = &self.blocks[index];
            let info = self.info(index);
            writeln!(
                out,
                "block:{:#010x}    size:{:7}    user:{}    tag:{}",
                info.offset,
                info.size,
                if info.has_owner { "yes" } else { "no " },
                info.tag
            )?;

            let Some(next) = block.next.map(|n| &self.blocks[n]) else {
                continue;
            };
            if block.offset + block.size != next.offset {
                writeln!(out, "ERROR: block size does not touch the next block")?;
            }
            if next.prev != Some(index) {
                writeln!(out, "ERROR: next block doesn't have proper back link")?;
            }
            if block.tag.is_free() && next.tag.is_free() {
                writeln!(out, "ERROR: two consecutive free blocks")?;
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn chain(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(Some(self.head), move |&i| self.blocks[i].next)
    }

    fn sum_where(&self, keep: impl Fn(&MemBlock) -> bool) -> usize {
        self.chain()
            .map(|i| &self.blocks[i])
            .filter(|b| keep(b))
            .map(|b| b.size)
            .sum()
    }

    fn info(&self, index: usize) -> BlockInfo {
        let block = &self.blocks[index];
        BlockInfo {
            offset: block.offset,
            size: block.size,
            requested: block.requested,
            tag: block.tag,
            has_owner: block.owner.as_ref().is_some_and(|o| !o.is_detached()),
        }
    }

    fn span_for(size: usize) -> Option<usize> {
        size.max(1)
            .checked_add(ALIGNMENT - 1)
            .map(|s| s & !(ALIGNMENT - 1))
    }

    fn lookup(&self, ptr: ZonePtr) -> ZoneResult<usize> {
        let index = ptr.slot() as usize;
        match self.blocks.get(index) {
            Some(block)
                if block.id == ZONE_ID
                    && !block.tag.is_free()
                    && block.generation == ptr.generation() =>
            {
                Ok(index)
            }
            _ => Err(ZoneError::InvalidPointer {
                bits: ptr.to_bits(),
            }),
        }
    }

    fn first_fit(&self, span: usize) -> Option<usize> {
        self.chain().find(|&i| {
            let block = &self.blocks[i];
            block.tag.is_free() && block.size >= span
        })
    }

    /// Frees purgeable blocks in address order until a free span of at
    /// least `span` bytes exists. Returns that block.
    fn evict_for(&mut self, span: usize) -> Option<usize> {
        self.stats.eviction_passes += 1;

        let mut purged = 0u64;
        let mut cursor = Some(self.head);

        while let Some(mut index) = cursor {
            if self.blocks[index].tag.is_purgeable() {
                index = self.release(index);
                purged += 1;
            }

            let block = &self.blocks[index];
            if block.tag.is_free() && block.size >= span {
                self.stats.purged += purged;
                debug!(span, purged, "eviction pass made room");
                return Some(index);
            }
            cursor = block.next;
        }

        self.stats.purged += purged;
        debug!(span, purged, "eviction pass scanned the whole zone without room");
        None
    }

    /// Splits `span` bytes off the front of free block `index`.
    fn carve(&mut self, index: usize, span: usize) {
        let extra = self.blocks[index].size - span;
        if extra < MIN_FRAGMENT {
            return;
        }

        let offset = self.blocks[index].offset + span;
        let next = self.blocks[index].next;
        let remainder = self.link_block(offset, extra, Some(index), next);

        if let Some(next) = next {
            self.blocks[next].prev = Some(remainder);
        }
        self.blocks[index].next = Some(remainder);
        self.blocks[index].size = span;
    }

    /// Marks block `index` free, empties its owner and coalesces. Returns
    /// the slot of the resulting free block.
    fn release(&mut self, index: usize) -> usize {
        let block = &mut self.blocks[index];
        let ptr = ZonePtr::new(index as u32, block.generation);
        if let Some(owner) = block.owner.take() {
            owner.clear(ptr);
        }
        block.tag = PurgeTag::Free;
        block.requested = 0;

        if let Some(next) = self.blocks[index].next {
            if self.blocks[next].tag.is_free() {
                self.absorb(index, next);
            }
        }

        match self.blocks[index].prev {
            Some(prev) if self.blocks[prev].tag.is_free() => {
                self.absorb(prev, index);
                prev
            }
            _ => index,
        }
    }

    /// Merges `upper` into the block directly below it.
    fn absorb(&mut self, lower: usize, upper: usize) {
        let (size, next) = (self.blocks[upper].size, self.blocks[upper].next);
        self.blocks[lower].size += size;
        self.blocks[lower].next = next;
        if let Some(next) = next {
            self.blocks[next].prev = Some(lower);
        }
        self.retire(upper);
    }

    fn link_block(
        &mut self,
        offset: usize,
        size: usize,
        prev: Option<usize>,
        next: Option<usize>,
    ) -> usize {
        let fresh = MemBlock {
            id: ZONE_ID,
            offset,
            size,
            requested: 0,
            tag: PurgeTag::Free,
            owner: None,
            generation: 0,
            prev,
            next,
        };

        if let Some(index) = self.spare.pop() {
            let generation = self.blocks[index].generation;
            self.blocks[index] = MemBlock { generation, ..fresh };
            index
        } else {
            self.blocks.push(fresh);
            self.blocks.len() - 1
        }
    }

    fn retire(&mut self, index: usize) {
        let block = &mut self.blocks[index];
        block.id = 0;
        block.size = 0;
        block.owner = None;
        block.prev = None;
        block.next = None;
        block.tag = PurgeTag::Free;
        block.generation = block.generation.wrapping_add(1);
        self.spare.push(index);
    }

    fn out_of_memory(&self, requested: usize) -> ZoneError {
        let (free, largest) = (self.free_bytes(), self.largest_free());
        error!(requested, free, largest, "zone allocation failed");
        ZoneError::OutOfMemory {
            requested,
            free,
            largest,
        }
    }

    fn corrupted(offset: usize, reason: impl Into<String>) -> ZoneError {
        let reason = reason.into();
        error!(offset, %reason, "zone integrity check failed");
        ZoneError::Corrupted { offset, reason }
    }
}
