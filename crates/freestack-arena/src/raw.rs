//! Low-level word access over the arena buffer.
//!
//! [`RawArena`] is the only place the arena's bytes are touched. Every
//! header read and write goes through [`RawArena::read_word`] /
//! [`RawArena::write_word`] by byte offset; callers never see a raw
//! pointer into the header area. Offsets are bounds-checked and must be
//! word-aligned.

#![allow(unsafe_code)]

use std::marker::PhantomData;
use std::mem::size_of;
use std::ptr::NonNull;

const WORD: usize = size_of::<usize>();

/// Word-granular view of a caller-supplied buffer.
///
/// Holds the buffer as a `NonNull` base plus a word count so that header
/// writes and the caller's payload accesses never go through overlapping
/// references. Neither `Send` nor `Sync`.
pub(crate) struct RawArena<'a> {
    base: NonNull<usize>,
    words: usize,
    _buffer: PhantomData<&'a mut [usize]>,
}

impl<'a> RawArena<'a> {
    /// Take exclusive ownership of `buffer` for `'a`.
    pub(crate) fn new(buffer: &'a mut [usize]) -> Self {
        let words = buffer.len();
        Self {
            base: NonNull::from(buffer).cast::<usize>(),
            words,
            _buffer: PhantomData,
        }
    }

    /// Capacity in bytes.
    pub(crate) fn len(&self) -> usize {
        self.words * WORD
    }

    /// Address of the first byte.
    pub(crate) fn base_addr(&self) -> usize {
        self.base.as_ptr() as usize
    }

    /// Read the word stored at byte `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is not word-aligned or out of bounds.
    pub(crate) fn read_word(&self, offset: usize) -> usize {
        let index = self.word_index(offset);
        // SAFETY: `index < self.words`, so the read stays inside the buffer
        // borrowed for `'a`, and `base` is word-aligned by construction.
        unsafe { self.base.as_ptr().add(index).read() }
    }

    /// Write `value` into the word at byte `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is not word-aligned or out of bounds.
    pub(crate) fn write_word(&self, offset: usize, value: usize) {
        let index = self.word_index(offset);
        // SAFETY: as in `read_word`. The buffer is exclusively borrowed by
        // this arena; no reference into it is ever handed out, only raw
        // payload pointers whose ranges are disjoint from headers.
        unsafe { self.base.as_ptr().add(index).write(value) }
    }

    /// Pointer to the byte at `offset`, carrying the buffer's provenance.
    ///
    /// # Panics
    ///
    /// Panics if `offset` exceeds the buffer length.
    pub(crate) fn ptr_at(&self, offset: usize) -> NonNull<u8> {
        assert!(
            offset <= self.len(),
            "offset {offset} outside arena of {} bytes",
            self.len()
        );
        // SAFETY: `offset <= len`, so the result is in bounds or one past
        // the end of the buffer, and it is derived from a non-null base.
        unsafe { NonNull::new_unchecked(self.base.as_ptr().cast::<u8>().add(offset)) }
    }

    /// Byte offset of `ptr` if it lies in `[base, base + len)`.
    pub(crate) fn offset_of(&self, ptr: *const u8) -> Option<usize> {
        let addr = ptr as usize;
        let base = self.base_addr();
        if addr >= base && addr < base + self.len() {
            Some(addr - base)
        } else {
            None
        }
    }

    fn word_index(&self, offset: usize) -> usize {
        assert!(
            offset % WORD == 0,
            "unaligned header offset {offset} (word size {WORD})"
        );
        let index = offset / WORD;
        assert!(
            index < self.words,
            "header offset {offset} outside arena of {} bytes",
            self.len()
        );
        index
    }
}
