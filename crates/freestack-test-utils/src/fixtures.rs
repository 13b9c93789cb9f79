//! Reusable fallback allocator fixtures.
//!
//! Three standard fallbacks for exercising the delegation path:
//!
//! - [`CountingFallback`]: system-backed, counts calls and live bytes.
//! - [`FailingFallback`]: refuses every request.
//! - [`TaggedFallback`]: system-backed, equal only to fallbacks with the same tag.

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use freestack_arena::{AllocError, Fallback, SystemFallback};

#[derive(Default)]
struct Counts {
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
    live_bytes: AtomicUsize,
}

/// Delegates to the global allocator and records every call.
///
/// Clones share their counters, and two `CountingFallback`s compare equal
/// only if they share counters. Useful for asserting that a request did or
/// did not spill out of the arena.
#[derive(Clone, Default)]
pub struct CountingFallback {
    counts: Arc<Counts>,
}

impl CountingFallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `allocate()` has succeeded.
    pub fn allocations(&self) -> usize {
        self.counts.allocations.load(Ordering::Relaxed)
    }

    /// How many times `deallocate()` has been called.
    pub fn deallocations(&self) -> usize {
        self.counts.deallocations.load(Ordering::Relaxed)
    }

    /// Bytes currently lent out by this fallback.
    pub fn live_bytes(&self) -> usize {
        self.counts.live_bytes.load(Ordering::Relaxed)
    }
}

impl PartialEq for CountingFallback {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.counts, &other.counts)
    }
}

impl std::fmt::Debug for CountingFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountingFallback")
            .field("allocations", &self.allocations())
            .field("deallocations", &self.deallocations())
            .field("live_bytes", &self.live_bytes())
            .finish()
    }
}

unsafe impl Fallback for CountingFallback {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let ptr = SystemFallback.allocate(layout)?;
        self.counts.allocations.fetch_add(1, Ordering::Relaxed);
        self.counts
            .live_bytes
            .fetch_add(layout.size(), Ordering::Relaxed);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.counts.deallocations.fetch_add(1, Ordering::Relaxed);
        self.counts
            .live_bytes
            .fetch_sub(layout.size(), Ordering::Relaxed);
        // SAFETY: forwarded contract; `ptr` came from `SystemFallback`.
        unsafe { SystemFallback.deallocate(ptr, layout) }
    }
}

/// Refuses every request with [`AllocError::OutOfMemory`].
///
/// Useful for testing that fallback exhaustion propagates to the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FailingFallback;

unsafe impl Fallback for FailingFallback {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        Err(AllocError::OutOfMemory {
            size: layout.size(),
            align: layout.align(),
        })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        panic!(
            "FailingFallback never allocates, yet was asked to free {ptr:p} ({} bytes)",
            layout.size()
        );
    }

    fn max_size(&self) -> usize {
        0
    }
}

/// System-backed fallback whose equality is decided by a tag.
///
/// Useful for testing that allocators over the same arena with different
/// fallbacks do not compare equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaggedFallback(pub u32);

unsafe impl Fallback for TaggedFallback {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        SystemFallback.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded contract; `ptr` came from `SystemFallback`.
        unsafe { SystemFallback.deallocate(ptr, layout) }
    }
}
