// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Translation table descriptor codecs.
//!
//! The ARM1176 short-descriptor format with ARMv6 extended page table
//! features enabled (`SCTLR.XP = 1`). Bits `[1:0]` of every descriptor select
//! its kind, and the kind alone decides how the remaining bits are read.
//!
//! First level (one word per MiB):
//!
//! ```text
//! 31        20 19 18 17 16 15 14  12 11 10 9 8    5 4  3 2 1 0
//! +-----------+--+--+--+--+---+-----+-----+-+------+--+-+-+---+
//! | base      |NS| 0|nG| S|APX| TEX | AP  |P|domain|XN|C|B|1 0|  section
//! | base[31:24]   | 1|  ...                                |1 0|  supersection
//! | coarse table base [31:10]               |P|domain| 0 |0 1|  coarse pointer
//! |                      ignored                         |0 0|  fault
//! ```
//!
//! Second level (one word per 4 KiB, 256 per coarse table):
//!
//! ```text
//! 31        16 15 14  12 11 10 9   8 6 5  4 3 2 1 0
//! | base      |XN| TEX  |nG| S|APX|   |AP  |C|B|0 1|  large page (64 KiB)
//! | base [31:12]          |nG| S|APX|TEX|AP  |C|B|1 XN| small page (4 KiB)
//! ```

use core::fmt;

use bitflags::bitflags;
use pibare_abi::Paddr;

/// Mask selecting the kind bits of any descriptor.
pub const KIND_MASK: u32 = 0b11;

bitflags! {
    /// Attribute bits of a first-level section or supersection descriptor.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SectionAttr: u32 {
        const BUFFERABLE = 1 << 2;
        const CACHEABLE = 1 << 3;
        const EXECUTE_NEVER = 1 << 4;
        const AP0 = 1 << 10;
        const AP1 = 1 << 11;
        const APX = 1 << 15;
        const SHARED = 1 << 16;
        const NOT_GLOBAL = 1 << 17;
        const SUPERSECTION = 1 << 18;
    }
}

bitflags! {
    /// Attribute bits of a second-level small or large page descriptor.
    ///
    /// `SMALL_XN` and `LARGE_XN` live at different positions; which one applies
    /// is decided by the descriptor kind.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PageAttr: u32 {
        const SMALL_XN = 1 << 0;
        const BUFFERABLE = 1 << 2;
        const CACHEABLE = 1 << 3;
        const AP0 = 1 << 4;
        const AP1 = 1 << 5;
        const APX = 1 << 9;
        const SHARED = 1 << 10;
        const NOT_GLOBAL = 1 << 11;
        const LARGE_XN = 1 << 15;
    }
}

const DOMAIN_SHIFT: u32 = 5;
const DOMAIN_MASK: u32 = 0xF << DOMAIN_SHIFT;

const SECTION_BASE_MASK: u32 = !0x000F_FFFF;
const SUPERSECTION_BASE_MASK: u32 = !0x00FF_FFFF;
const COARSE_BASE_MASK: u32 = !0x0000_03FF;
const SMALL_BASE_MASK: u32 = !0x0000_0FFF;
const LARGE_BASE_MASK: u32 = !0x0000_FFFF;

/// Low two bits of a first-level descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// `00`: translation fault.
    Fault,
    /// `01`: pointer to a coarse second-level table.
    Coarse,
    /// `10`: section or supersection.
    Section,
    /// `11`: reserved; faults like `00`.
    Reserved,
}

/// Permission class of a mapping.
///
/// | Class      | APX | AP | Privileged | User      |
/// |------------|-----|----|------------|-----------|
/// | `NoAccess` | 0   | 00 | no access  | no access |
/// | `KernelRw` | 0   | 01 | read/write | no access |
/// | `UserRw`   | 0   | 11 | read/write | read/write|
/// | `KernelRo` | 1   | 01 | read-only  | no access |
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessClass {
    /// Kernel read/write, user no access.
    KernelRw,
    /// Kernel read-only, user no access.
    KernelRo,
    /// Full read/write access from both modes.
    UserRw,
    /// No access from any mode.
    NoAccess,
}

impl AccessClass {
    /// `(APX, AP[1:0])` encoding of this class.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> (bool, u32) {
        match self {
            Self::NoAccess => (false, 0b00),
            Self::KernelRw => (false, 0b01),
            Self::UserRw => (false, 0b11),
            Self::KernelRo => (true, 0b01),
        }
    }

    /// Decodes `(APX, AP[1:0])`.
    ///
    /// Returns `None` for encodings outside the four classes the boot core
    /// produces.
    #[inline]
    #[must_use]
    pub const fn from_bits(apx: bool, ap: u32) -> Option<Self> {
        match (apx, ap & 0b11) {
            (false, 0b00) => Some(Self::NoAccess),
            (false, 0b01) => Some(Self::KernelRw),
            (false, 0b11) => Some(Self::UserRw),
            (true, 0b01) => Some(Self::KernelRo),
            _ => None,
        }
    }

    /// Checks whether user mode may access a mapping of this class.
    #[inline]
    #[must_use]
    pub const fn user_accessible(self) -> bool {
        matches!(self, Self::UserRw)
    }

    /// Checks whether privileged mode may write a mapping of this class.
    #[inline]
    #[must_use]
    pub const fn kernel_writable(self) -> bool {
        matches!(self, Self::KernelRw | Self::UserRw)
    }
}

/// Decoded first-level descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Descriptor {
    /// No mapping.
    Fault,
    /// Reserved encoding; treated as a fault.
    Reserved,
    /// 1 MiB block mapping.
    Section {
        /// Physical base of the section.
        base: Paddr,
        /// Permission class, `None` for encodings outside [`AccessClass`].
        access: Option<AccessClass>,
        /// Instruction fetches fault.
        execute_never: bool,
        /// Domain the mapping belongs to.
        domain: u8,
    },
    /// 16 MiB block mapping (always domain 0).
    Supersection {
        /// Physical base of the supersection.
        base: Paddr,
        /// Permission class, `None` for encodings outside [`AccessClass`].
        access: Option<AccessClass>,
        /// Instruction fetches fault.
        execute_never: bool,
    },
    /// Pointer to a second-level coarse table.
    Coarse {
        /// Physical address of the coarse table.
        table: Paddr,
        /// Domain every page in the table belongs to.
        domain: u8,
    },
}

/// A first-level translation table descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct PageTableEntry(u32);

impl PageTableEntry {
    /// Descriptor producing a translation fault.
    pub const FAULT: Self = Self(0);

    /// Wraps a raw descriptor word.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw descriptor word.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Builds a 1 MiB section descriptor.
    ///
    /// `base` is truncated to a 1 MiB boundary; `domain` to four bits.
    #[must_use]
    pub const fn section(base: Paddr, access: AccessClass, execute_never: bool, domain: u8) -> Self {
        let (apx, ap) = access.bits();
        let mut raw = (base.as_u32() & SECTION_BASE_MASK) | 0b10;
        raw |= ((domain as u32) << DOMAIN_SHIFT) & DOMAIN_MASK;
        raw |= ap << 10;
        if apx {
            raw |= SectionAttr::APX.bits();
        }
        if execute_never {
            raw |= SectionAttr::EXECUTE_NEVER.bits();
        }
        Self(raw)
    }

    /// Builds a 16 MiB supersection descriptor.
    ///
    /// `base` is truncated to a 16 MiB boundary. Supersections are always in
    /// domain 0.
    #[must_use]
    pub const fn supersection(base: Paddr, access: AccessClass, execute_never: bool) -> Self {
        let (apx, ap) = access.bits();
        let mut raw = (base.as_u32() & SUPERSECTION_BASE_MASK) | SectionAttr::SUPERSECTION.bits() | 0b10;
        raw |= ap << 10;
        if apx {
            raw |= SectionAttr::APX.bits();
        }
        if execute_never {
            raw |= SectionAttr::EXECUTE_NEVER.bits();
        }
        Self(raw)
    }

    /// Builds a pointer to a coarse table.
    ///
    /// `table` is truncated to a 1 KiB boundary.
    #[must_use]
    pub const fn coarse(table: Paddr, domain: u8) -> Self {
        let raw = (table.as_u32() & COARSE_BASE_MASK)
            | (((domain as u32) << DOMAIN_SHIFT) & DOMAIN_MASK)
            | 0b01;
        Self(raw)
    }

    /// Kind selected by bits `[1:0]`.
    #[inline]
    #[must_use]
    pub const fn kind(self) -> EntryKind {
        match self.0 & KIND_MASK {
            0b00 => EntryKind::Fault,
            0b01 => EntryKind::Coarse,
            0b10 => EntryKind::Section,
            _ => EntryKind::Reserved,
        }
    }

    /// Checks the supersection flag. Only meaningful for section-kind entries.
    #[inline]
    #[must_use]
    pub const fn is_supersection(self) -> bool {
        (self.0 & SectionAttr::SUPERSECTION.bits()) != 0
    }

    /// Decodes the descriptor according to its kind.
    #[must_use]
    pub const fn decode(self) -> Descriptor {
        match self.kind() {
            EntryKind::Fault => Descriptor::Fault,
            EntryKind::Reserved => Descriptor::Reserved,
            EntryKind::Coarse => Descriptor::Coarse {
                table: Paddr::new(self.0 & COARSE_BASE_MASK),
                domain: self.domain(),
            },
            EntryKind::Section => {
                let apx = (self.0 & SectionAttr::APX.bits()) != 0;
                let access = AccessClass::from_bits(apx, self.0 >> 10);
                let execute_never = (self.0 & SectionAttr::EXECUTE_NEVER.bits()) != 0;
                if self.is_supersection() {
                    Descriptor::Supersection {
                        base: Paddr::new(self.0 & SUPERSECTION_BASE_MASK),
                        access,
                        execute_never,
                    }
                } else {
                    Descriptor::Section {
                        base: Paddr::new(self.0 & SECTION_BASE_MASK),
                        access,
                        execute_never,
                        domain: self.domain(),
                    }
                }
            }
        }
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "domain field is four bits wide"
    )]
    const fn domain(self) -> u8 {
        ((self.0 & DOMAIN_MASK) >> DOMAIN_SHIFT) as u8
    }
}

impl fmt::Debug for PageTableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageTableEntry({:#010x})", self.0)
    }
}

/// Decoded second-level descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageDescriptor {
    /// No mapping.
    Fault,
    /// 64 KiB page.
    Large {
        /// Physical base of the page.
        base: Paddr,
        /// Permission class, `None` for encodings outside [`AccessClass`].
        access: Option<AccessClass>,
        /// Instruction fetches fault.
        execute_never: bool,
    },
    /// 4 KiB page.
    Small {
        /// Physical base of the page.
        base: Paddr,
        /// Permission class, `None` for encodings outside [`AccessClass`].
        access: Option<AccessClass>,
        /// Instruction fetches fault.
        execute_never: bool,
    },
}

/// A second-level (coarse table) descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct CoarseEntry(u32);

impl CoarseEntry {
    /// Descriptor producing a translation fault.
    pub const FAULT: Self = Self(0);

    /// Wraps a raw descriptor word.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw descriptor word.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Builds a 4 KiB small page descriptor.
    #[must_use]
    pub const fn small_page(base: Paddr, access: AccessClass, execute_never: bool) -> Self {
        let (apx, ap) = access.bits();
        let mut raw = (base.as_u32() & SMALL_BASE_MASK) | 0b10;
        raw |= ap << 4;
        if apx {
            raw |= PageAttr::APX.bits();
        }
        if execute_never {
            raw |= PageAttr::SMALL_XN.bits();
        }
        Self(raw)
    }

    /// Builds a 64 KiB large page descriptor.
    ///
    /// The hardware expects the descriptor repeated in 16 consecutive slots.
    #[must_use]
    pub const fn large_page(base: Paddr, access: AccessClass, execute_never: bool) -> Self {
        let (apx, ap) = access.bits();
        let mut raw = (base.as_u32() & LARGE_BASE_MASK) | 0b01;
        raw |= ap << 4;
        if apx {
            raw |= PageAttr::APX.bits();
        }
        if execute_never {
            raw |= PageAttr::LARGE_XN.bits();
        }
        Self(raw)
    }

    /// Checks whether the descriptor produces a translation fault.
    #[inline]
    #[must_use]
    pub const fn is_fault(self) -> bool {
        (self.0 & KIND_MASK) == 0
    }

    /// Decodes the descriptor according to its kind.
    #[must_use]
    pub const fn decode(self) -> PageDescriptor {
        let apx = (self.0 & PageAttr::APX.bits()) != 0;
        let access = AccessClass::from_bits(apx, self.0 >> 4);
        match self.0 & KIND_MASK {
            0b00 => PageDescriptor::Fault,
            0b01 => PageDescriptor::Large {
                base: Paddr::new(self.0 & LARGE_BASE_MASK),
                access,
                execute_never: (self.0 & PageAttr::LARGE_XN.bits()) != 0,
            },
            _ => PageDescriptor::Small {
                base: Paddr::new(self.0 & SMALL_BASE_MASK),
                access,
                execute_never: (self.0 & PageAttr::SMALL_XN.bits()) != 0,
            },
        }
    }
}

impl fmt::Debug for CoarseEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CoarseEntry({:#010x})", self.0)
    }
}
