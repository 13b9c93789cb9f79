//! Allocation counters and free-list occupancy.
//!
//! [`ArenaStats`] combines cumulative counters kept by the arena with a
//! point-in-time view of the free list, so callers can watch how often
//! requests spill to the fallback and how fragmented the arena has become.

/// Counters and occupancy for one arena.
///
/// The counters are cumulative since construction and shared by every
/// allocator handle aliasing the arena. The occupancy fields are computed
/// by walking the free list when the stats are requested.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Requests served from the arena.
    pub arena_allocations: u64,
    /// Requests delegated to the fallback allocator.
    pub fallback_allocations: u64,
    /// Blocks returned to the free list.
    pub arena_deallocations: u64,
    /// Deallocations routed to the fallback allocator.
    pub fallback_deallocations: u64,
    /// Arena allocations that split a free block in two.
    pub splits: u64,
    /// Arena allocations that consumed a whole free block.
    pub whole_block_grants: u64,
    /// Number of blocks currently on the free list.
    pub free_blocks: usize,
    /// Sum of the sizes of all free blocks, headers included.
    pub free_bytes: usize,
    /// Size of the largest free block, header included.
    pub largest_free_block: usize,
    /// Arena capacity in bytes.
    pub capacity: usize,
}

impl ArenaStats {
    /// Fraction of allocation requests served by the arena.
    ///
    /// Returns `None` before the first allocation.
    pub fn hit_ratio(&self) -> Option<f64> {
        let total = self.arena_allocations + self.fallback_allocations;
        if total == 0 {
            return None;
        }
        Some(self.arena_allocations as f64 / total as f64)
    }
}

#[derive(Clone, Copy, Default)]
pub(crate) struct Counters {
    pub(crate) arena_allocations: u64,
    pub(crate) fallback_allocations: u64,
    pub(crate) arena_deallocations: u64,
    pub(crate) fallback_deallocations: u64,
    pub(crate) splits: u64,
    pub(crate) whole_block_grants: u64,
}
