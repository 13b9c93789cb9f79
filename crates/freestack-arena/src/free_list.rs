//! The free-list arena: block carving, release and inspection.
//!
//! A [`FreeListArena`] owns a borrowed word buffer and threads a singly
//! linked free list through it. Byte offset 0 holds the list head; every
//! other byte belongs to exactly one block:
//!
//! ```text
//! offset 0          W
//! ┌────────┬────────┬────────┬──────────┬────────┬────────┬─────────────┐
//! │  head  │ size   │ next   │ ...free  │ size   │ payload (caller)     │
//! └────────┴────────┴────────┴──────────┴────────┴──────────────────────┘
//!           └──── free block ───────────┘└──── used block ─────────────┘
//! ```
//!
//! Free blocks are searched first-fit in list order (most recently freed
//! first) and are never merged with their neighbours.

use std::cell::Cell;
use std::ptr::NonNull;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::block::{FreeBlock, Link, NIL};
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::raw::RawArena;
use crate::stats::{ArenaStats, Counters};

const W: usize = ArenaConfig::WORD;

/// A fixed-capacity arena managed by an embedded free list.
///
/// The arena is the shared state behind every
/// [`BoundedFreeListAllocator`](crate::BoundedFreeListAllocator) handle
/// built over it. It never frees or grows the buffer it borrows.
pub struct FreeListArena<'a> {
    raw: RawArena<'a>,
    counters: Cell<Counters>,
}

impl<'a> FreeListArena<'a> {
    /// Build an arena over `buffer`, partitioned into one free block.
    ///
    /// Returns [`ArenaError::ArenaTooSmall`] if the buffer cannot hold the
    /// head slot, a used header and a free header.
    pub fn new(buffer: &'a mut [usize]) -> Result<Self, ArenaError> {
        let capacity = buffer.len() * W;
        if capacity < ArenaConfig::MIN_CAPACITY {
            return Err(ArenaError::ArenaTooSmall {
                capacity,
                minimum: ArenaConfig::MIN_CAPACITY,
            });
        }

        let raw = RawArena::new(buffer);
        let first = ArenaConfig::HEAD_SLOT_SIZE;
        raw.write_word(first, capacity - ArenaConfig::HEAD_SLOT_SIZE);
        raw.write_word(Link::after(first).offset(), NIL);
        raw.write_word(Link::HEAD.offset(), first);

        debug!(capacity, base = raw.base_addr(), "free-list arena initialised");

        Ok(Self {
            raw,
            counters: Cell::new(Counters::default()),
        })
    }

    /// Capacity in bytes, head slot included.
    pub fn capacity(&self) -> usize {
        self.raw.len()
    }

    /// Address of the first byte of the buffer.
    ///
    /// Two handles share an arena iff their base addresses are equal.
    pub fn base_addr(&self) -> usize {
        self.raw.base_addr()
    }

    /// Whether `ptr` lies in `[arena_start, arena_end)`.
    pub fn contains(&self, ptr: *const u8) -> bool {
        self.raw.offset_of(ptr).is_some()
    }

    /// Carve a used block with `payload` bytes out of the first free block
    /// that fits.
    ///
    /// `payload` must be a multiple of the word size. Returns `None` when
    /// no free block is large enough; the free list is then untouched.
    pub(crate) fn allocate_bytes(&self, payload: usize) -> Option<NonNull<u8>> {
        debug_assert!(payload % W == 0, "payload {payload} not word-rounded");
        let needed = payload.checked_add(ArenaConfig::USED_HEADER_SIZE)?;
        let (link, block) = self.iter_free().find(|(_, block)| block.size >= needed)?;
        let next = self.raw.read_word(Link::after(block.offset).offset());

        if block.size - needed >= ArenaConfig::FREE_HEADER_SIZE {
            // Shrink to exactly the used size; the residual takes over the
            // block's position in the list.
            let residual = block.offset + needed;
            self.raw.write_word(block.offset, needed);
            self.raw.write_word(residual, block.size - needed);
            self.raw.write_word(Link::after(residual).offset(), next);
            self.raw.write_word(link.offset(), residual);
            self.bump(|c| c.splits += 1);
            trace!(
                offset = block.offset,
                used = needed,
                residual = block.size - needed,
                "split free block"
            );
        } else {
            self.raw.write_word(link.offset(), next);
            self.bump(|c| c.whole_block_grants += 1);
            trace!(
                offset = block.offset,
                size = block.size,
                requested = needed,
                "granted whole free block"
            );
        }

        self.bump(|c| c.arena_allocations += 1);
        Some(self.raw.ptr_at(block.offset + ArenaConfig::USED_HEADER_SIZE))
    }

    /// Return the used block whose payload starts at `ptr` to the head of
    /// the free list.
    ///
    /// `requested` is the payload size the caller believes it owns.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` is not inside the arena, if the recovered header is
    /// out of bounds or malformed, or if `requested` exceeds the block's
    /// recorded payload.
    pub(crate) fn release(&self, ptr: NonNull<u8>, requested: usize) {
        let offset = self
            .raw
            .offset_of(ptr.as_ptr())
            .unwrap_or_else(|| panic!("pointer {ptr:p} is not owned by this arena"));
        assert!(
            offset >= ArenaConfig::HEAD_SLOT_SIZE + ArenaConfig::USED_HEADER_SIZE && offset % W == 0,
            "pointer at arena offset {offset} is not a block payload"
        );

        let block = offset - ArenaConfig::USED_HEADER_SIZE;
        let size = self.raw.read_word(block);
        assert!(
            size >= ArenaConfig::FREE_HEADER_SIZE && size <= self.capacity() - block,
            "corrupt block header at offset {block}: size {size}"
        );
        let recorded = size - ArenaConfig::USED_HEADER_SIZE;
        assert!(
            requested <= recorded,
            "deallocation of {requested} bytes exceeds block payload of {recorded} bytes"
        );

        let head = self.raw.read_word(Link::HEAD.offset());
        self.raw.write_word(Link::after(block).offset(), head);
        self.raw.write_word(Link::HEAD.offset(), block);
        self.bump(|c| c.arena_deallocations += 1);
        trace!(offset = block, size, "released block to free list");
    }

    /// Size of the largest free block, header included.
    ///
    /// `None` when every byte of the arena is lent out.
    pub fn largest_free_block(&self) -> Option<usize> {
        self.iter_free().map(|(_, block)| block.size).max()
    }

    /// The free list in list order (most recently freed first).
    pub fn free_blocks(&self) -> SmallVec<[FreeBlock; 8]> {
        self.iter_free().map(|(_, block)| block).collect()
    }

    /// Cumulative counters plus a fresh walk of the free list.
    pub fn stats(&self) -> ArenaStats {
        let c = self.counters.get();
        let mut stats = ArenaStats {
            arena_allocations: c.arena_allocations,
            fallback_allocations: c.fallback_allocations,
            arena_deallocations: c.arena_deallocations,
            fallback_deallocations: c.fallback_deallocations,
            splits: c.splits,
            whole_block_grants: c.whole_block_grants,
            capacity: self.capacity(),
            ..Default::default()
        };
        for (_, block) in self.iter_free() {
            stats.free_blocks += 1;
            stats.free_bytes += block.size;
            stats.largest_free_block = stats.largest_free_block.max(block.size);
        }
        stats
    }

    pub(crate) fn record_fallback_allocation(&self) {
        self.bump(|c| c.fallback_allocations += 1);
    }

    pub(crate) fn record_fallback_deallocation(&self) {
        self.bump(|c| c.fallback_deallocations += 1);
    }

    fn bump(&self, update: impl FnOnce(&mut Counters)) {
        let mut c = self.counters.get();
        update(&mut c);
        self.counters.set(c);
    }

    fn iter_free(&self) -> FreeIter<'_, 'a> {
        FreeIter {
            raw: &self.raw,
            link: Link::HEAD,
            // Every free block is at least a free header long.
            remaining: self.capacity() / ArenaConfig::FREE_HEADER_SIZE,
        }
    }
}

/// Walks the free list, yielding each block with the link that points at it.
struct FreeIter<'r, 'a> {
    raw: &'r RawArena<'a>,
    link: Link,
    remaining: usize,
}

impl Iterator for FreeIter<'_, '_> {
    type Item = (Link, FreeBlock);

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.raw.read_word(self.link.offset());
        if offset == NIL {
            return None;
        }
        assert!(self.remaining > 0, "free list does not terminate");
        self.remaining -= 1;

        let block = FreeBlock::new(offset, self.raw.read_word(offset));
        let link = self.link;
        self.link = Link::after(offset);
        Some((link, block))
    }
}
