// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Physical and virtual addresses of the 32-bit ARM1176 address space.
//!
//! The MMU has no large physical address extension, so both kinds are plain
//! 32-bit words. Arithmetic wraps at 4 GiB like the hardware does.

use core::fmt;

macro_rules! address {
    ($name:ident) => {
        impl $name {
            #[doc = concat!("A ", stringify!($name), " holding `addr`.")]
            #[inline]
            #[must_use]
            pub const fn new(addr: u32) -> Self {
                Self(addr)
            }

            /// The raw word.
            #[inline]
            #[must_use]
            pub const fn as_u32(self) -> u32 {
                self.0
            }

            /// The address `offset` bytes further on.
            #[inline]
            #[must_use]
            pub const fn add(self, offset: u32) -> Self {
                Self(self.0.wrapping_add(offset))
            }

            /// Bytes from `other` up to `self`.
            #[inline]
            #[must_use]
            pub const fn diff(self, other: Self) -> u32 {
                self.0.wrapping_sub(other.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:#010x})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#010x}", self.0)
            }
        }
    };
}

/// An address on the bus: what TTBR0, table descriptors and the VideoCore
/// mailbox expect.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct Paddr(u32);

address!(Paddr);

impl Paddr {
    /// Address zero: the vector page, never a valid buffer.
    #[inline]
    #[must_use]
    pub const fn null() -> Self {
        Self(0)
    }

    /// Checks for address zero.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Checks alignment to `alignment`, which must be a power of two.
    #[inline]
    #[must_use]
    pub const fn is_aligned(self, alignment: u32) -> bool {
        debug_assert!(alignment.is_power_of_two());
        self.0 & alignment.wrapping_sub(1) == 0
    }
}

/// An address as the CPU issues it, resolved through the active translation
/// table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct Vaddr(u32);

address!(Vaddr);

impl Vaddr {
    /// Address of a kernel object.
    ///
    /// On a 64-bit host the upper half of the pointer is dropped.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "pointers are 32 bits wide on the target"
    )]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize as u32)
    }
}
