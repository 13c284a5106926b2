// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! BCM2835 PL011 UART driver (write-only).
//!
//! The firmware leaves UART0 configured at 115200 baud; the driver only
//! feeds the transmit FIFO. The registers are reached through the physical
//! window, so the driver is usable as soon as the boot table is active.

use core::ptr::{read_volatile, write_volatile};

use pibare_abi::Paddr;
use pibare_abi::layout::PERIPHERAL_BASE;

use super::UartWriter;

/// PL011 UART physical base address on the BCM2835.
pub const PL011_PADDR: Paddr = PERIPHERAL_BASE.add(0x0020_1000);

/// Data Register offset.
const UARTDR: usize = 0x00;

/// Flag Register offset.
const UARTFR: usize = 0x18;

/// Flag Register bit: TX FIFO Full.
const UARTFR_TXFF: u32 = 1 << 5;

/// PL011 UART writer.
#[derive(Debug)]
pub struct Pl011Writer {
    /// Virtual address of the UART MMIO region.
    base: *mut u32,
}

// SAFETY: single core; the kernel owns the only writer.
unsafe impl Send for Pl011Writer {}

impl Pl011Writer {
    /// Creates a writer for the registers at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the mapped virtual address of the PL011 register block
    /// whenever the writer is used, and no other driver may use the UART.
    #[must_use]
    pub const unsafe fn new(base: *mut u32) -> Self {
        Self { base }
    }
}

impl UartWriter for Pl011Writer {
    fn write_byte(&mut self, byte: u8) {
        // SAFETY: `new` guarantees the register block is mapped.
        let fr_ptr = unsafe { self.base.add(UARTFR / 4) };
        // Wait for TX FIFO to have space
        // SAFETY: fr_ptr points to a valid UART register
        while (unsafe { read_volatile(fr_ptr) } & UARTFR_TXFF) != 0 {
            core::hint::spin_loop();
        }
        // SAFETY: as above
        let dr_ptr = unsafe { self.base.add(UARTDR / 4) };
        // SAFETY: dr_ptr points to a valid UART register
        unsafe { write_volatile(dr_ptr, u32::from(byte)) };
    }
}
