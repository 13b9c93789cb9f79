//! The general-purpose allocator that absorbs requests the arena cannot serve.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::ptr::{self, NonNull};

use crate::error::AllocError;

/// An allocator that receives requests the arena cannot satisfy.
///
/// Handles are cloned along with the allocator that owns them, and two
/// allocators are interchangeable only if their fallbacks compare equal,
/// hence the `Clone + PartialEq` bounds.
///
/// # Safety
///
/// Implementations must return memory that is valid for the requested
/// layout, stays valid until passed back to `deallocate`, and never lies
/// inside an arena buffer. The allocator routes deallocations purely by
/// address range, so an overlapping pointer would corrupt the free list.
pub unsafe trait Fallback: Clone + PartialEq {
    /// Allocate memory for `layout`.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Release memory returned by [`Fallback::allocate`].
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this fallback (or one
    /// equal to it) with the same `layout`, and not released since.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Largest single request this fallback could theoretically serve, in
    /// bytes.
    fn max_size(&self) -> usize {
        isize::MAX as usize
    }
}

/// Fallback backed by the global allocator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemFallback;

unsafe impl Fallback for SystemFallback {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return NonNull::new(ptr::without_provenance_mut(layout.align())).ok_or(
                AllocError::OutOfMemory {
                    size: 0,
                    align: layout.align(),
                },
            );
        }
        // SAFETY: `layout` has a non-zero size.
        let ptr = unsafe { alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(AllocError::OutOfMemory {
            size: layout.size(),
            align: layout.align(),
        })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        // SAFETY: the caller guarantees `ptr` came from `alloc::alloc` with
        // this `layout`.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
    }
}
