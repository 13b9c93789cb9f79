//! The allocator handle: typed allocate/deallocate over a shared arena.
//!
//! A [`BoundedFreeListAllocator`] is a cheap handle. Cloning it aliases
//! the same [`FreeListArena`] (through an `Rc`) and clones the fallback;
//! the arena itself is never duplicated. Requests the arena cannot serve
//! are handed to the fallback, and deallocations are routed back by
//! address range.

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::rc::Rc;

use tracing::debug;

use crate::config::ArenaConfig;
use crate::error::{AllocError, ArenaError};
use crate::fallback::{Fallback, SystemFallback};
use crate::free_list::FreeListArena;
use crate::stats::ArenaStats;

/// Allocator for elements of type `T`, backed by a fixed arena and
/// overflowing to `F`.
///
/// Single-threaded: the handle is neither `Send` nor `Sync`.
pub struct BoundedFreeListAllocator<'a, T, F: Fallback = SystemFallback> {
    arena: Rc<FreeListArena<'a>>,
    fallback: F,
    config: ArenaConfig,
    _element: PhantomData<fn() -> T>,
}

impl<'a, T, F: Fallback> BoundedFreeListAllocator<'a, T, F> {
    /// Build a new arena over `buffer` and a handle to it.
    ///
    /// Fails if `T` is zero-sized, over-aligned, does not divide the
    /// buffer's byte capacity, or if the buffer is too small for the
    /// block headers.
    pub fn new(buffer: &'a mut [usize], fallback: F) -> Result<Self, ArenaError> {
        let config = ArenaConfig::for_element::<T>(std::mem::size_of_val(buffer));
        config.validate()?;
        let arena = Rc::new(FreeListArena::new(buffer)?);
        Ok(Self {
            arena,
            fallback,
            config,
            _element: PhantomData,
        })
    }

    /// Build another handle over an existing arena.
    pub fn from_arena(arena: Rc<FreeListArena<'a>>, fallback: F) -> Result<Self, ArenaError> {
        let config = ArenaConfig::for_element::<T>(arena.capacity());
        config.validate()?;
        Ok(Self {
            arena,
            fallback,
            config,
            _element: PhantomData,
        })
    }

    /// Allocate room for `n` elements.
    ///
    /// Served first-fit from the arena when a free block is large enough,
    /// otherwise by the fallback. `n == 0` yields a dangling, well-aligned
    /// pointer that touches neither.
    pub fn allocate(&self, n: usize) -> Result<NonNull<T>, AllocError> {
        if n == 0 {
            return Ok(NonNull::dangling());
        }
        let overflow = AllocError::CapacityOverflow {
            count: n,
            element_size: self.config.element_size,
        };
        let payload = self.config.payload_bytes(n).ok_or(overflow.clone())?;
        if let Some(ptr) = self.arena.allocate_bytes(payload) {
            return Ok(ptr.cast());
        }

        let layout = Layout::array::<T>(n).map_err(|_| overflow)?;
        debug!(
            requested = payload,
            largest_free = self.arena.largest_free_block().unwrap_or(0),
            "arena exhausted, delegating to fallback"
        );
        let ptr = self.fallback.allocate(layout)?;
        self.arena.record_fallback_allocation();
        Ok(ptr.cast())
    }

    /// Release `n` elements at `ptr`.
    ///
    /// Arena pointers go back to the head of the free list; anything else
    /// is handed to the fallback.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`allocate`](Self::allocate) on this
    /// allocator or one equal to it, `n` must not exceed the count it was
    /// allocated with, and it must not have been released since.
    ///
    /// # Panics
    ///
    /// Panics if an arena pointer's recorded block is too small for `n`
    /// elements, or its header is out of bounds.
    pub unsafe fn deallocate(&self, ptr: NonNull<T>, n: usize) {
        if n == 0 {
            return;
        }
        let bytes = ptr.cast::<u8>();
        if self.arena.contains(bytes.as_ptr()) {
            let requested = n
                .checked_mul(self.config.element_size)
                .unwrap_or(usize::MAX);
            self.arena.release(bytes, requested);
            return;
        }

        let layout = match Layout::array::<T>(n) {
            Ok(layout) => layout,
            Err(_) => panic!("deallocation of {n} elements overflows the address space"),
        };
        // SAFETY: not an arena pointer, so by the caller's contract it came
        // from the fallback with this layout.
        unsafe { self.fallback.deallocate(bytes, layout) };
        self.arena.record_fallback_deallocation();
    }

    /// Theoretical maximum element count, as bounded by the fallback.
    ///
    /// The arena capacity is deliberately not folded in; see
    /// [`max_stack_size`](Self::max_stack_size) for that.
    pub fn max_size(&self) -> usize {
        self.fallback.max_size() / self.config.element_size
    }

    /// Largest element count the arena could serve right now without
    /// falling back. Walks the free list once.
    pub fn max_stack_size(&self) -> usize {
        self.arena.largest_free_block().map_or(0, |size| {
            (size - ArenaConfig::USED_HEADER_SIZE) / self.config.element_size
        })
    }

    /// A handle for element type `U` over the same arena.
    ///
    /// Fails with [`ArenaError::IncompatibleElementSize`] if `size_of::<U>()`
    /// does not divide the arena's byte capacity.
    pub fn rebind<U>(&self) -> Result<BoundedFreeListAllocator<'a, U, F>, ArenaError> {
        BoundedFreeListAllocator::from_arena(Rc::clone(&self.arena), self.fallback.clone())
    }

    /// Whether `ptr` points into this allocator's arena.
    pub fn owns(&self, ptr: NonNull<T>) -> bool {
        self.arena.contains(ptr.cast::<u8>().as_ptr())
    }

    /// The shared arena.
    pub fn arena(&self) -> &Rc<FreeListArena<'a>> {
        &self.arena
    }

    /// The fallback allocator.
    pub fn fallback(&self) -> &F {
        &self.fallback
    }

    /// Configuration validated at construction.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Counters and occupancy of the shared arena.
    pub fn stats(&self) -> ArenaStats {
        self.arena.stats()
    }
}

impl<T, F: Fallback> Clone for BoundedFreeListAllocator<'_, T, F> {
    fn clone(&self) -> Self {
        Self {
            arena: Rc::clone(&self.arena),
            fallback: self.fallback.clone(),
            config: self.config,
            _element: PhantomData,
        }
    }
}

impl<'a, T, U, F: Fallback> PartialEq<BoundedFreeListAllocator<'a, U, F>>
    for BoundedFreeListAllocator<'a, T, F>
{
    fn eq(&self, other: &BoundedFreeListAllocator<'a, U, F>) -> bool {
        self.arena.base_addr() == other.arena.base_addr() && self.fallback == other.fallback
    }
}

impl<T, F: Fallback + Eq> Eq for BoundedFreeListAllocator<'_, T, F> {}

impl<T, F: Fallback + fmt::Debug> fmt::Debug for BoundedFreeListAllocator<'_, T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedFreeListAllocator")
            .field("base", &format_args!("{:#x}", self.arena.base_addr()))
            .field("capacity", &self.arena.capacity())
            .field("element_size", &self.config.element_size)
            .field("fallback", &self.fallback)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    const W: usize = ArenaConfig::WORD;

    #[test]
    fn allocate_serves_from_arena() {
        let mut buf = [0usize; 32];
        let alloc = BoundedFreeListAllocator::<u32, _>::new(&mut buf, SystemFallback).unwrap();
        let ptr = alloc.allocate(4).unwrap();
        assert!(alloc.owns(ptr));
        assert_eq!(ptr.as_ptr() as usize % std::mem::align_of::<u32>(), 0);
        unsafe {
            for i in 0..4 {
                ptr.as_ptr().add(i).write(i as u32 * 10);
            }
            assert_eq!(ptr.as_ptr().add(3).read(), 30);
            alloc.deallocate(ptr, 4);
        }
        assert_eq!(alloc.stats().arena_allocations, 1);
        assert_eq!(alloc.stats().arena_deallocations, 1);
    }

    #[test]
    fn max_stack_size_of_fresh_arena() {
        let mut buf = [0usize; 32];
        let alloc = BoundedFreeListAllocator::<u8, _>::new(&mut buf, SystemFallback).unwrap();
        // One block of 31 words, minus the used header.
        assert_eq!(alloc.max_stack_size(), 30 * W);
        let wide = alloc.rebind::<u64>().unwrap();
        assert_eq!(wide.max_stack_size(), 30 * W / 8);
    }

    #[test]
    fn oversized_request_falls_back() {
        let mut buf = [0usize; 8];
        let alloc = BoundedFreeListAllocator::<u8, _>::new(&mut buf, SystemFallback).unwrap();
        let ptr = alloc.allocate(64 * W).unwrap();
        assert!(!alloc.owns(ptr));
        unsafe { alloc.deallocate(ptr, 64 * W) };
        let stats = alloc.stats();
        assert_eq!(stats.fallback_allocations, 1);
        assert_eq!(stats.fallback_deallocations, 1);
        assert_eq!(stats.arena_allocations, 0);
    }

    #[test]
    #[traced_test]
    fn fallback_delegation_is_logged() {
        let mut buf = [0usize; 8];
        let alloc = BoundedFreeListAllocator::<u8, _>::new(&mut buf, SystemFallback).unwrap();
        let ptr = alloc.allocate(64 * W).unwrap();
        unsafe { alloc.deallocate(ptr, 64 * W) };
        assert!(logs_contain("arena exhausted, delegating to fallback"));
    }

    #[test]
    fn zero_count_touches_nothing() {
        let mut buf = [0usize; 8];
        let alloc = BoundedFreeListAllocator::<u64, _>::new(&mut buf, SystemFallback).unwrap();
        let ptr = alloc.allocate(0).unwrap();
        assert_eq!(ptr, NonNull::dangling());
        unsafe { alloc.deallocate(ptr, 0) };
        let stats = alloc.stats();
        assert_eq!(stats.arena_allocations + stats.fallback_allocations, 0);
    }

    #[test]
    fn overflowing_count_is_an_error() {
        let mut buf = [0usize; 8];
        let alloc = BoundedFreeListAllocator::<u64, _>::new(&mut buf, SystemFallback).unwrap();
        assert_eq!(
            alloc.allocate(usize::MAX),
            Err(AllocError::CapacityOverflow {
                count: usize::MAX,
                element_size: 8,
            })
        );
    }

    #[test]
    fn max_size_defers_to_fallback() {
        let mut buf = [0usize; 8];
        let alloc = BoundedFreeListAllocator::<u32, _>::new(&mut buf, SystemFallback).unwrap();
        assert_eq!(alloc.max_size(), isize::MAX as usize / 4);
    }

    #[test]
    fn clone_aliases_the_arena() {
        let mut buf = [0usize; 32];
        let a = BoundedFreeListAllocator::<u8, _>::new(&mut buf, SystemFallback).unwrap();
        let b = a.clone();
        assert_eq!(a, b);
        assert!(Rc::ptr_eq(a.arena(), b.arena()));
        let ptr = b.allocate(W).unwrap();
        assert!(a.owns(ptr));
        assert_eq!(a.max_stack_size(), b.max_stack_size());
        unsafe { a.deallocate(ptr, W) };
        assert_eq!(b.stats().arena_deallocations, 1);
    }

    #[test]
    fn different_arenas_are_unequal() {
        let mut one = [0usize; 16];
        let mut two = [0usize; 16];
        let a = BoundedFreeListAllocator::<u8, _>::new(&mut one, SystemFallback).unwrap();
        let b = BoundedFreeListAllocator::<u8, _>::new(&mut two, SystemFallback).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rebound_handle_equals_original() {
        let mut buf = [0usize; 16];
        let a = BoundedFreeListAllocator::<u64, _>::new(&mut buf, SystemFallback).unwrap();
        let b = a.rebind::<u16>().unwrap();
        assert!(a == b);
        assert_eq!(b.config().capacity, a.config().capacity);
    }

    #[test]
    fn rebind_rejects_non_divisor() {
        let mut buf = [0usize; 16];
        let a = BoundedFreeListAllocator::<u8, _>::new(&mut buf, SystemFallback).unwrap();
        let err = a.rebind::<[u8; 3]>().unwrap_err();
        assert!(matches!(err, ArenaError::IncompatibleElementSize { element_size: 3, .. }));
    }

    #[test]
    fn construction_rejects_small_buffer() {
        let mut buf = [0usize; 2];
        let result = BoundedFreeListAllocator::<u8, _>::new(&mut buf, SystemFallback);
        assert!(matches!(result, Err(ArenaError::ArenaTooSmall { .. })));
    }

    #[test]
    #[should_panic(expected = "exceeds block payload")]
    fn deallocating_more_than_allocated_panics() {
        let mut buf = [0usize; 32];
        let alloc = BoundedFreeListAllocator::<u64, _>::new(&mut buf, SystemFallback).unwrap();
        let ptr = alloc.allocate(2).unwrap();
        unsafe { alloc.deallocate(ptr, 3) };
    }

    #[test]
    fn debug_shows_capacity() {
        let mut buf = [0usize; 8];
        let alloc = BoundedFreeListAllocator::<u8, _>::new(&mut buf, SystemFallback).unwrap();
        let text = format!("{alloc:?}");
        assert!(text.contains("capacity"));
        assert!(text.contains("SystemFallback"));
    }
}
