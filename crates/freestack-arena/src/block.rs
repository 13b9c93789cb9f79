//! Block descriptors and free-list link slots.
//!
//! Blocks are identified by their byte offset inside the arena. A
//! [`FreeBlock`] is a read-only snapshot of one free-list entry; a
//! [`Link`] names the word that points at a free block (the head slot or
//! a predecessor's `next` field).

use std::fmt;

use crate::config::ArenaConfig;

/// Snapshot of one free block, as reported by
/// [`FreeListArena::free_blocks`](crate::FreeListArena::free_blocks).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub struct FreeBlock {
    pub(crate) offset: usize,
    pub(crate) size: usize,
}

impl FreeBlock {
    pub(crate) fn new(offset: usize, size: usize) -> Self {
        Self { offset, size }
    }

    /// Byte offset of the block header within the arena.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Total block size in bytes, header included.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Largest payload this block could serve as a used block.
    pub fn payload_capacity(&self) -> usize {
        self.size - ArenaConfig::USED_HEADER_SIZE
    }
}

impl fmt::Display for FreeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FreeBlock(off={}, size={})", self.offset, self.size)
    }
}

/// Byte offset of a word holding a free-block offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Link(usize);

impl Link {
    /// The arena's head slot.
    pub(crate) const HEAD: Link = Link(0);

    /// The `next` field of the free block at `block`.
    pub(crate) fn after(block: usize) -> Self {
        Link(block + ArenaConfig::WORD)
    }

    pub(crate) fn offset(self) -> usize {
        self.0
    }
}

/// End-of-list sentinel. Offset 0 is the head slot, never a block.
pub(crate) const NIL: usize = 0;
