// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Fixed virtual address space layout.
//!
//! ```text
//! 0x0000_0000 - 0x000F_FFFF  identity window (boot only)
//! 0x8000_0000 - 0xA0FF_FFFF  physical window: RAM + peripherals, one-to-one
//! 0xC000_0000 - 0xC3FF_FFFF  kernel data (first MB mapped at boot)
//! 0xF000_0000 - 0xF00F_FFFF  kernel code
//! ```
//!
//! These addresses are ABI: the linker script places the kernel at
//! [`KERNEL_CODE_BASE`] and [`KERNEL_DATA_BASE`], and every driver reaches its
//! registers through [`PHYS_WINDOW_BASE`].

use crate::types::{Paddr, Vaddr};

/// Size of a first-level section (1 MiB).
pub const SECTION_SIZE: u32 = 1 << 20;

/// Size of a small page (4 KiB).
pub const PAGE_SIZE: u32 = 1 << 12;

/// Start of the physical window.
pub const PHYS_WINDOW_BASE: Vaddr = Vaddr::new(0x8000_0000);

/// End (exclusive) of the physical window.
pub const PHYS_WINDOW_END: Vaddr = Vaddr::new(0xA100_0000);

/// Physical address the window starts at.
pub const PHYS_WINDOW_TARGET: Paddr = Paddr::new(0x0000_0000);

/// Physical base of the BCM2835 peripheral block.
pub const PERIPHERAL_BASE: Paddr = Paddr::new(0x2000_0000);

/// Start of the kernel data region.
pub const KERNEL_DATA_BASE: Vaddr = Vaddr::new(0xC000_0000);

/// Start of the kernel code window.
pub const KERNEL_CODE_BASE: Vaddr = Vaddr::new(0xF000_0000);

/// Transitional identity window the boot code runs in before the jump.
pub const IDENTITY_BASE: Vaddr = Vaddr::new(0x0000_0000);

/// Virtual address of a physical address inside the physical window.
///
/// Returns `None` outside the window: the mapping is undefined there.
#[inline]
#[must_use]
pub const fn physical_to_virtual(paddr: Paddr) -> Option<Vaddr> {
    let span = PHYS_WINDOW_END.diff(PHYS_WINDOW_BASE);
    let offset = paddr.diff(PHYS_WINDOW_TARGET);
    if offset >= span {
        return None;
    }
    Some(PHYS_WINDOW_BASE.add(offset))
}

// Compile-time verification of the layout
const _: () = {
    assert!(PHYS_WINDOW_END.as_u32() <= KERNEL_DATA_BASE.as_u32());
    assert!(KERNEL_DATA_BASE.as_u32() < KERNEL_CODE_BASE.as_u32());
    assert!(PHYS_WINDOW_BASE.as_u32() % SECTION_SIZE == 0);
    assert!(PHYS_WINDOW_END.as_u32() % SECTION_SIZE == 0);
    assert!(KERNEL_DATA_BASE.as_u32() % SECTION_SIZE == 0);
    assert!(KERNEL_CODE_BASE.as_u32() % SECTION_SIZE == 0);
    // Peripherals must be reachable through the window
    assert!(PERIPHERAL_BASE.as_u32() < PHYS_WINDOW_END.diff(PHYS_WINDOW_BASE));
};
