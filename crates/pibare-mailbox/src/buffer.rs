// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The message buffer shared with the VideoCore.
//!
//! The firmware rewrites the buffer in place while the ARM waits on the
//! mailbox. Every access therefore goes through a volatile read or write,
//! and the buffer hands out no references into its words.

use core::cell::UnsafeCell;
use core::fmt;
use core::ptr::{read_volatile, write_volatile};

use crate::error::PropertyError;

/// Words in a property buffer (1 KiB).
pub const BUFFER_WORDS: usize = 256;

/// One word the firmware may rewrite behind the compiler's back.
#[repr(transparent)]
struct SharedWord(UnsafeCell<u32>);

/// A 16-byte aligned message buffer.
///
/// The low four bits of the address handed to the mailbox carry the channel
/// number, so the alignment is part of the protocol.
#[repr(C, align(16))]
pub struct PropertyBuffer {
    words: [SharedWord; BUFFER_WORDS],
}

impl PropertyBuffer {
    /// Creates a zeroed buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            words: [const { SharedWord(UnsafeCell::new(0)) }; BUFFER_WORDS],
        }
    }

    /// Number of words the buffer holds.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        BUFFER_WORDS
    }

    /// Reads word `index`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u32> {
        self.words.get(index).map(|word| {
            // SAFETY: the cell is never borrowed; the pointer is valid and
            // aligned for the lifetime of `self`.
            unsafe { read_volatile(word.0.get()) }
        })
    }

    /// Writes word `index`.
    ///
    /// # Errors
    ///
    /// [`PropertyError::BufferOverflow`] past the end of the buffer.
    #[inline]
    pub fn set(&self, index: usize, value: u32) -> Result<(), PropertyError> {
        let word = self.words.get(index).ok_or(PropertyError::BufferOverflow {
            needed: index + 1,
            capacity: BUFFER_WORDS,
        })?;
        // SAFETY: as for `get`.
        unsafe { write_volatile(word.0.get(), value) };
        Ok(())
    }

    /// Zeroes every word.
    pub fn clear(&self) {
        for word in &self.words {
            // SAFETY: as for `get`.
            unsafe { write_volatile(word.0.get(), 0) };
        }
    }

    /// Copies the first `N` words out, for diagnostics and tests.
    #[must_use]
    pub fn snapshot<const N: usize>(&self) -> [u32; N] {
        let mut out = [0; N];
        for (index, slot) in out.iter_mut().enumerate() {
            *slot = self.get(index).unwrap_or(0);
        }
        out
    }

    /// Address of the first word.
    #[inline]
    #[must_use]
    pub const fn as_ptr(&self) -> *const u32 {
        self.words.as_ptr().cast::<u32>()
    }
}

impl Default for PropertyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PropertyBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBuffer")
            .field("address", &self.as_ptr())
            .field("size", &self.get(0).unwrap_or(0))
            .field("code", &self.get(1).unwrap_or(0))
            .finish_non_exhaustive()
    }
}
