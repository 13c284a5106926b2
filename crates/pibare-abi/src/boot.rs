// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Boot protocol definitions for kernel entry.
//!
//! The firmware loader jumps to the kernel image with three registers set.
//! They are left untouched by the early boot code so the high-memory entry
//! point receives exactly what the loader provided.
//!
//! | Register | Content |
//! |----------|---------|
//! | r0 | always zero |
//! | r1 | machine type (`0x0c42` on the BCM2708) |
//! | r2 | physical address of the ATAG list |

use core::fmt;

use crate::types::Paddr;

/// Machine type identifier from the ARM Linux machine registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct MachineType(u32);

impl MachineType {
    /// Broadcom BCM2708 (Raspberry Pi).
    pub const BCM2708: Self = Self(0x0c42);

    /// Creates a machine type from its raw register value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw register value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MachineType({:#06x})", self.0)
    }
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::BCM2708 {
            write!(f, "{:#06x} (Broadcom BCM2708)", self.0)
        } else {
            write!(f, "{:#06x} (unknown)", self.0)
        }
    }
}

/// Arguments passed to the kernel entry point.
///
/// This structure mirrors the register layout above.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct BootArgs {
    /// Value of r0; the boot protocol requires zero.
    pub r0: u32,

    /// Board identifier.
    pub machine_type: MachineType,

    /// Physical address of the boot-information tag list.
    pub atags: Paddr,
}

impl BootArgs {
    /// Builds the argument block from raw register values.
    #[inline]
    #[must_use]
    pub const fn from_registers(r0: u32, r1: u32, r2: u32) -> Self {
        Self {
            r0,
            machine_type: MachineType::new(r1),
            atags: Paddr::new(r2),
        }
    }

    /// Checks whether the loader identified the expected board.
    #[inline]
    #[must_use]
    pub const fn is_expected_board(&self) -> bool {
        self.machine_type.as_u32() == MachineType::BCM2708.as_u32()
    }
}
