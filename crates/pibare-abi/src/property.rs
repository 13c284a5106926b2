// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Property-tag protocol constants.
//!
//! The VideoCore firmware negotiates resources through a message of
//! little-endian 32-bit words placed in shared memory:
//!
//! ```text
//! word 0      total message size in bytes
//! word 1      request/response code
//! tags...     { tag id, value buffer size, request/response length, value... }
//! word n      zero end tag
//! ```
//!
//! Every value here is fixed by the firmware; none of it is configurable.

use core::fmt;

/// Mailbox channel carrying property-tag messages (ARM to VideoCore).
pub const PROPERTY_CHANNEL: u8 = 8;

/// Message code written by the ARM when sending a request.
pub const PROCESS_REQUEST: u32 = 0x0000_0000;

/// Message code written back by the firmware on success.
pub const RESPONSE_SUCCESS: u32 = 0x8000_0000;

/// Message code written back by the firmware when parsing the request failed.
pub const RESPONSE_ERROR: u32 = 0x8000_0001;

/// Bit set in a tag's length word once the firmware has answered it.
pub const RESPONSE_BIT: u32 = 1 << 31;

/// Mask extracting the response length from a tag's length word.
pub const RESPONSE_LENGTH_MASK: u32 = !RESPONSE_BIT;

/// Words in a tag header (id, value buffer size, length).
pub const TAG_HEADER_WORDS: usize = 3;

/// Words before the first tag (size, code).
pub const MESSAGE_HEADER_WORDS: usize = 2;

/// Property tag identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct TagId(u32);

impl TagId {
    /// End tag terminating a message.
    pub const END: Self = Self(0x0000_0000);

    /// Get ARM memory: base and size in bytes.
    pub const GET_ARM_MEMORY: Self = Self(0x0001_0005);

    /// Get VideoCore memory: base and size in bytes.
    pub const GET_VC_MEMORY: Self = Self(0x0001_0006);

    /// Allocate framebuffer: alignment in, base and size out.
    pub const ALLOCATE_FRAMEBUFFER: Self = Self(0x0004_0001);

    /// Get physical (display) width and height.
    pub const GET_PHYSICAL_DISPLAY_SIZE: Self = Self(0x0004_0003);

    /// Get pitch: bytes per line.
    pub const GET_PITCH: Self = Self(0x0004_0008);

    /// Set physical (display) width and height.
    pub const SET_PHYSICAL_SIZE: Self = Self(0x0004_8003);

    /// Set virtual (buffer) width and height.
    pub const SET_VIRTUAL_SIZE: Self = Self(0x0004_8004);

    /// Set depth: bits per pixel.
    pub const SET_DEPTH: Self = Self(0x0004_8005);

    /// Get the kernel command line as a NUL-terminated string.
    pub const GET_COMMAND_LINE: Self = Self(0x0005_0001);

    /// Creates a tag identifier from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Checks whether this is the end tag.
    #[inline]
    #[must_use]
    pub const fn is_end(self) -> bool {
        self.0 == 0
    }

    /// Short name of a catalogued tag.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            0x0000_0000 => Some("end"),
            0x0001_0005 => Some("get-arm-memory"),
            0x0001_0006 => Some("get-vc-memory"),
            0x0004_0001 => Some("allocate-framebuffer"),
            0x0004_0003 => Some("get-physical-display-size"),
            0x0004_0008 => Some("get-pitch"),
            0x0004_8003 => Some("set-physical-size"),
            0x0004_8004 => Some("set-virtual-size"),
            0x0004_8005 => Some("set-depth"),
            0x0005_0001 => Some("get-command-line"),
            _ => None,
        }
    }
}

impl fmt::Debug for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagId({:#010x})", self.0)
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "tag {:#010x}", self.0),
        }
    }
}

/// Number of 32-bit words needed to hold `bytes` bytes.
#[inline]
#[must_use]
pub const fn words_for(bytes: u32) -> usize {
    bytes.div_ceil(4) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_buffers_round_up_to_words() {
        assert_eq!(words_for(0), 0);
        assert_eq!(words_for(1), 1);
        assert_eq!(words_for(4), 1);
        assert_eq!(words_for(8), 2);
        assert_eq!(words_for(195 * 4), 195);
        assert_eq!(words_for(6), 2);
    }

    #[test]
    fn catalogued_tags_have_names() {
        assert_eq!(format!("{}", TagId::GET_PITCH), "get-pitch");
        assert_eq!(format!("{}", TagId::new(0x0003_0002)), "tag 0x00030002");
        assert!(TagId::END.is_end());
        assert!(!TagId::SET_DEPTH.is_end());
    }

    #[test]
    fn response_bit_and_mask_partition_the_word() {
        assert_eq!(RESPONSE_BIT | RESPONSE_LENGTH_MASK, u32::MAX);
        assert_eq!(RESPONSE_BIT & RESPONSE_LENGTH_MASK, 0);
        assert_eq!(RESPONSE_SUCCESS & RESPONSE_BIT, RESPONSE_BIT);
    }
}
