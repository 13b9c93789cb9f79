//! Arena-specific error types.

use std::error::Error;
use std::fmt;

/// Configuration errors, detected when an arena or allocator handle is
/// built. Never returned from `allocate` or `deallocate`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The buffer cannot hold the head slot plus one used and one free header.
    ArenaTooSmall {
        /// Capacity supplied, in bytes.
        capacity: usize,
        /// Smallest accepted capacity, in bytes.
        minimum: usize,
    },
    /// Zero-sized element types cannot be counted against a byte capacity.
    ZeroSizedElement,
    /// The element type needs stricter alignment than block offsets provide.
    UnsupportedAlignment {
        /// `align_of` the element type.
        align: usize,
        /// Largest supported alignment (one machine word).
        max: usize,
    },
    /// The element size does not evenly divide the arena byte capacity.
    IncompatibleElementSize {
        /// `size_of` the element type.
        element_size: usize,
        /// Arena capacity in bytes.
        capacity: usize,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArenaTooSmall { capacity, minimum } => {
                write!(
                    f,
                    "arena too small: {capacity} bytes, at least {minimum} bytes required"
                )
            }
            Self::ZeroSizedElement => write!(f, "zero-sized element types are not supported"),
            Self::UnsupportedAlignment { align, max } => {
                write!(f, "element alignment {align} exceeds supported maximum {max}")
            }
            Self::IncompatibleElementSize {
                element_size,
                capacity,
            } => {
                write!(
                    f,
                    "incompatible element size for this arena capacity: \
                     {element_size} does not divide {capacity} bytes"
                )
            }
        }
    }
}

impl Error for ArenaError {}

/// Errors returned by allocation requests.
///
/// Arena exhaustion is not an error (the request is delegated to the
/// fallback allocator); these only surface when the fallback itself fails
/// or the request cannot be sized at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// The fallback allocator could not satisfy the request.
    OutOfMemory {
        /// Requested size in bytes.
        size: usize,
        /// Requested alignment in bytes.
        align: usize,
    },
    /// `count * element_size` overflows the address space.
    CapacityOverflow {
        /// Requested element count.
        count: usize,
        /// `size_of` the element type.
        element_size: usize,
    },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { size, align } => {
                write!(f, "out of memory: {size} bytes (align {align})")
            }
            Self::CapacityOverflow {
                count,
                element_size,
            } => {
                write!(
                    f,
                    "capacity overflow: {count} elements of {element_size} bytes"
                )
            }
        }
    }
}

impl Error for AllocError {}
