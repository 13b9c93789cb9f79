//! Arena configuration parameters and layout constants.

use std::mem::{align_of, size_of};

use crate::error::ArenaError;

/// Configuration for a free-list arena serving one element type.
///
/// Describes the byte capacity of the backing buffer and the size and
/// alignment of the element type the allocator hands out. Validated at
/// construction; all values are immutable after creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Total size of the backing buffer in bytes, head slot included.
    pub capacity: usize,

    /// `size_of` the element type served by the allocator.
    pub element_size: usize,

    /// `align_of` the element type served by the allocator.
    ///
    /// Must not exceed [`ArenaConfig::WORD`]: block offsets are only
    /// guaranteed to be word-aligned.
    pub element_align: usize,
}

impl ArenaConfig {
    /// Machine word size. Every header field is one word.
    pub const WORD: usize = size_of::<usize>();

    /// The first word of the arena stores the free-list head.
    pub const HEAD_SLOT_SIZE: usize = Self::WORD;

    /// Used blocks carry `size`.
    pub const USED_HEADER_SIZE: usize = Self::WORD;

    /// Free blocks carry `size` and `next`.
    pub const FREE_HEADER_SIZE: usize = 2 * Self::WORD;

    /// Smallest accepted capacity in bytes.
    ///
    /// The capacity must be strictly greater than the sum of the head slot
    /// and both header kinds.
    pub const MIN_CAPACITY: usize =
        Self::HEAD_SLOT_SIZE + Self::USED_HEADER_SIZE + Self::FREE_HEADER_SIZE + 1;

    /// Create a config for element type `T` over `capacity` bytes.
    pub fn for_element<T>(capacity: usize) -> Self {
        Self {
            capacity,
            element_size: size_of::<T>(),
            element_align: align_of::<T>(),
        }
    }

    /// Check the configuration against the arena layout rules.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.element_size == 0 {
            return Err(ArenaError::ZeroSizedElement);
        }
        if self.element_align > Self::WORD {
            return Err(ArenaError::UnsupportedAlignment {
                align: self.element_align,
                max: Self::WORD,
            });
        }
        if self.capacity < Self::MIN_CAPACITY {
            return Err(ArenaError::ArenaTooSmall {
                capacity: self.capacity,
                minimum: Self::MIN_CAPACITY,
            });
        }
        if self.capacity % self.element_size != 0 {
            return Err(ArenaError::IncompatibleElementSize {
                element_size: self.element_size,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Payload bytes reserved for `count` elements.
    ///
    /// Rounded up to a whole number of words so that the block following
    /// the payload starts on a word boundary. Returns `None` on overflow.
    pub fn payload_bytes(&self, count: usize) -> Option<usize> {
        let raw = count.checked_mul(self.element_size)?;
        let rounded = raw.checked_add(Self::WORD - 1)?;
        Some(rounded & !(Self::WORD - 1))
    }

    /// Same capacity, re-expressed for element type `U`.
    ///
    /// Fails if `U` does not evenly divide the byte capacity, or is
    /// otherwise unusable with this arena.
    pub fn rebind<U>(&self) -> Result<Self, ArenaError> {
        let config = Self::for_element::<U>(self.capacity);
        config.validate()?;
        Ok(config)
    }

    /// Number of whole elements the byte capacity represents.
    pub fn capacity_in_elements(&self) -> usize {
        self.capacity / self.element_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: usize = ArenaConfig::WORD;

    #[test]
    fn min_capacity_exceeds_all_headers() {
        assert_eq!(ArenaConfig::MIN_CAPACITY, 4 * W + 1);
        let config = ArenaConfig::for_element::<u8>(4 * W);
        assert!(matches!(
            config.validate(),
            Err(ArenaError::ArenaTooSmall { .. })
        ));
    }

    #[test]
    fn zero_sized_element_rejected() {
        let config = ArenaConfig::for_element::<()>(1024);
        assert_eq!(config.validate(), Err(ArenaError::ZeroSizedElement));
    }

    #[test]
    fn over_aligned_element_rejected() {
        #[repr(align(64))]
        struct Wide([u8; 64]);
        let config = ArenaConfig::for_element::<Wide>(1024);
        assert_eq!(
            config.validate(),
            Err(ArenaError::UnsupportedAlignment { align: 64, max: W })
        );
    }

    #[test]
    fn payload_rounds_up_to_word() {
        let config = ArenaConfig::for_element::<u8>(1024);
        assert_eq!(config.payload_bytes(0), Some(0));
        assert_eq!(config.payload_bytes(1), Some(W));
        assert_eq!(config.payload_bytes(W), Some(W));
        assert_eq!(config.payload_bytes(W + 1), Some(2 * W));
    }

    #[test]
    fn payload_overflow_is_none() {
        let config = ArenaConfig::for_element::<u64>(1024);
        assert_eq!(config.payload_bytes(usize::MAX), None);
        let bytes = ArenaConfig::for_element::<u8>(1024);
        assert_eq!(bytes.payload_bytes(usize::MAX), None);
    }

    #[test]
    fn rebind_keeps_capacity() {
        let config = ArenaConfig::for_element::<u64>(1024);
        let rebound = config.rebind::<u16>().unwrap();
        assert_eq!(rebound.capacity, 1024);
        assert_eq!(rebound.element_size, 2);
        assert_eq!(rebound.capacity_in_elements(), 512);
    }

    #[test]
    fn rebind_rejects_non_divisor() {
        let config = ArenaConfig::for_element::<u8>(1000);
        assert_eq!(
            config.rebind::<[u8; 3]>(),
            Err(ArenaError::IncompatibleElementSize {
                element_size: 3,
                capacity: 1000,
            })
        );
    }
}
