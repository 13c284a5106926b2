// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The ACT LED on GPIO 16.
//!
//! The LED is wired active low: clearing the pin lights it.

use core::ptr::{read_volatile, write_volatile};

use pibare_abi::Paddr;
use pibare_abi::layout::PERIPHERAL_BASE;

use crate::fatal::StatusLed;

/// GPIO controller physical base.
pub const GPIO_PADDR: Paddr = PERIPHERAL_BASE.add(0x0020_0000);

/// Function select register for GPIO 10..19.
const GPFSEL1: usize = 0x04;

/// Pin output set register 0.
const GPSET0: usize = 0x1C;

/// Pin output clear register 0.
const GPCLR0: usize = 0x28;

/// LED pin.
const ACT_PIN: u32 = 16;

/// Bit offset of the pin's function field in GPFSEL1.
const ACT_FSEL_SHIFT: u32 = (ACT_PIN - 10) * 3;

/// Function select value: output.
const FSEL_OUTPUT: u32 = 0b001;

/// Busy-loop iterations per pause unit.
const SPINS_PER_UNIT: u32 = 0x0010_0000;

/// The ACT LED.
#[derive(Debug)]
pub struct ActLed {
    base: *mut u32,
}

impl ActLed {
    /// Claims the LED and configures its pin as an output.
    ///
    /// # Safety
    ///
    /// `base` must address the GPIO register block: [`GPIO_PADDR`] with the
    /// MMU off, its physical-window alias once the boot table is active.
    #[must_use]
    pub unsafe fn new(base: *mut u32) -> Self {
        let led = Self { base };
        let select = led.read(GPFSEL1) & !(0b111 << ACT_FSEL_SHIFT);
        led.write(GPFSEL1, select | (FSEL_OUTPUT << ACT_FSEL_SHIFT));
        led
    }

    fn read(&self, offset: usize) -> u32 {
        // SAFETY: `new` guarantees the register block is addressable.
        unsafe { read_volatile(self.base.add(offset / 4)) }
    }

    fn write(&self, offset: usize, value: u32) {
        // SAFETY: as for `read`.
        unsafe { write_volatile(self.base.add(offset / 4), value) }
    }
}

impl StatusLed for ActLed {
    fn set(&mut self, lit: bool) {
        let register = if lit { GPCLR0 } else { GPSET0 };
        self.write(register, 1 << ACT_PIN);
    }

    fn pause(&mut self, units: u32) {
        for _ in 0..units.saturating_mul(SPINS_PER_UNIT) {
            // SAFETY: a no-op that keeps the loop from being optimized out.
            unsafe { core::arch::asm!("nop", options(nomem, nostack, preserves_flags)) };
        }
    }
}
