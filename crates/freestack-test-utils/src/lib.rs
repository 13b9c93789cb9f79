//! Test utilities and fixtures for freestack development.
//!
//! Provides fallback allocator fixtures ([`CountingFallback`],
//! [`FailingFallback`], [`TaggedFallback`]) and helpers for sizing arena
//! buffers and checking that allocations do not overlap.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{CountingFallback, FailingFallback, TaggedFallback};

/// Machine word size, re-exported for byte arithmetic in tests.
pub const WORD: usize = std::mem::size_of::<usize>();

/// A zeroed arena buffer of at least `bytes` bytes, rounded up to whole words.
pub fn stack_buffer(bytes: usize) -> Vec<usize> {
    vec![0; bytes.div_ceil(WORD)]
}

/// Half-open byte range `[start, start + len)` of an allocation.
pub fn byte_range<T>(ptr: std::ptr::NonNull<T>, count: usize) -> std::ops::Range<usize> {
    let start = ptr.as_ptr() as usize;
    start..start + count * std::mem::size_of::<T>()
}

/// Whether any two of the given byte ranges overlap.
pub fn any_overlap(ranges: &[std::ops::Range<usize>]) -> bool {
    let mut sorted: Vec<_> = ranges.iter().filter(|r| !r.is_empty()).cloned().collect();
    sorted.sort_by_key(|r| r.start);
    sorted.windows(2).any(|pair| pair[0].end > pair[1].start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_buffer_rounds_up() {
        assert_eq!(stack_buffer(1).len(), 1);
        assert_eq!(stack_buffer(WORD).len(), 1);
        assert_eq!(stack_buffer(WORD + 1).len(), 2);
    }

    #[test]
    fn overlap_detection() {
        assert!(!any_overlap(&[0..8, 8..16, 32..40]));
        assert!(any_overlap(&[0..9, 8..16]));
        assert!(!any_overlap(&[4..4, 0..8]));
    }
}
