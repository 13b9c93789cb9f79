//! freestack: a fixed-capacity free-list allocator that spills to a fallback.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the freestack sub-crates. For most users, adding `freestack` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use freestack::prelude::*;
//!
//! // 64 words of arena; the first word is the free-list head.
//! let mut stack = [0usize; 64];
//! let alloc = BoundedFreeListAllocator::<u32, _>::new(&mut stack, SystemFallback).unwrap();
//!
//! // Small requests are carved out of the arena.
//! let small = alloc.allocate(8).unwrap();
//! assert!(alloc.owns(small));
//!
//! // Requests larger than any free block go to the fallback.
//! let large = alloc.allocate(4096).unwrap();
//! assert!(!alloc.owns(large));
//!
//! unsafe {
//!     alloc.deallocate(large, 4096);
//!     alloc.deallocate(small, 8);
//! }
//! assert_eq!(alloc.stats().fallback_allocations, 1);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`arena`] | `freestack-arena` | Allocator handle, free-list arena, fallbacks, config, stats |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Free-list arena and allocator handle (`freestack-arena`).
///
/// Most users only need [`arena::BoundedFreeListAllocator`] and a
/// [`arena::Fallback`]; both are also available in the [`prelude`].
pub use freestack_arena as arena;

/// Common imports for typical freestack usage.
///
/// ```rust
/// use freestack::prelude::*;
/// ```
pub mod prelude {
    // Allocator and arena
    pub use freestack_arena::{BoundedFreeListAllocator, FreeBlock, FreeListArena};

    // Fallbacks
    pub use freestack_arena::{Fallback, SystemFallback};

    // Configuration and observability
    pub use freestack_arena::{ArenaConfig, ArenaStats};

    // Errors
    pub use freestack_arena::{AllocError, ArenaError};
}
