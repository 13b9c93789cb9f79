//! Fixed-capacity free-list arena allocation with fallback delegation.
//!
//! Serves typed allocation requests from a single caller-supplied buffer
//! using an embedded, first-fit free list, and hands requests the buffer
//! cannot satisfy to a general-purpose [`Fallback`] allocator.
//!
//! # Architecture
//!
//! ```text
//! BoundedFreeListAllocator<T, F> (cheap handle, Clone = alias)
//! ├── Rc<FreeListArena> (shared arena state)
//! │   └── RawArena (word access over &mut [usize], the only unsafe reads/writes)
//! └── F: Fallback (SystemFallback by default)
//! ```
//!
//! # Block layout
//!
//! The first word of the buffer holds the free-list head. Free blocks carry
//! `size` and `next`; used blocks carry `size` only, and the caller's
//! pointer starts right after it. Blocks are split on allocation when the
//! leftover can hold a free header, and are pushed back onto the list head
//! unchanged on deallocation. Adjacent free blocks are never coalesced, so
//! long-running churn can fragment the arena; [`ArenaStats`] reports how
//! many free blocks exist and the largest one.
//!
//! # Threading
//!
//! Handles are `!Send` and `!Sync`: an arena and every handle over it stay
//! on the thread that built them.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod allocator;
pub mod block;
pub mod config;
pub mod error;
pub mod fallback;
pub mod free_list;
mod raw;
pub mod stats;

// Public re-exports for the primary API surface.
pub use allocator::BoundedFreeListAllocator;
pub use block::FreeBlock;
pub use config::ArenaConfig;
pub use error::{AllocError, ArenaError};
pub use fallback::{Fallback, SystemFallback};
pub use free_list::FreeListArena;
pub use stats::ArenaStats;
