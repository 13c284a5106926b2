// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Fatal error reporting.
//!
//! Before the framebuffer exists the only output is the ACT LED. A fatal
//! code is shown as a burst of `code` blinks followed by a long pause,
//! repeated forever.

use pibare_abi::layout::physical_to_virtual;
use pibare_abi::{FatalCode, Paddr};
use pibare_mmu::SystemControl;
use pibare_mmu::regs::SCTLR_MMU_ENABLE;

/// Pause units the LED stays lit per blink.
pub const BLINK_ON: u32 = 1;

/// Pause units the LED stays dark between blinks.
pub const BLINK_OFF: u32 = 1;

/// Pause units between two bursts.
pub const BURST_GAP: u32 = 6;

/// A single status LED and a crude delay.
pub trait StatusLed {
    /// Switches the LED on or off.
    fn set(&mut self, lit: bool);

    /// Busy-waits for `units` pause units.
    fn pause(&mut self, units: u32);
}

/// Blinks one burst for `code`.
pub fn blink_code<L: StatusLed + ?Sized>(led: &mut L, code: FatalCode) {
    for _ in 0..code.blink_count() {
        led.set(true);
        led.pause(BLINK_ON);
        led.set(false);
        led.pause(BLINK_OFF);
    }
    led.pause(BURST_GAP);
}

/// Terminal sink for unrecoverable bring-up failures.
pub trait FatalReporter {
    /// Reports `code` and halts.
    fn report_fatal(&mut self, code: FatalCode) -> !;
}

/// Address space a fatal report runs in.
///
/// A failure can happen before the MMU is on, when only physical addresses
/// work and the logger's statics sit at unmapped virtual addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSpace {
    /// MMU off: peripherals at their bus addresses, no logging.
    Physical,
    /// MMU on: peripherals through the physical window, logging available.
    Window,
}

impl ReportSpace {
    /// Space selected by the MMU enable bit.
    pub fn current<S: SystemControl + ?Sized>(regs: &S) -> Self {
        if regs.sctlr() & SCTLR_MMU_ENABLE == 0 {
            Self::Physical
        } else {
            Self::Window
        }
    }

    /// Checks whether the logger may be used.
    #[must_use]
    pub const fn can_log(self) -> bool {
        matches!(self, Self::Window)
    }

    /// Address of the register block at `paddr` in this space.
    ///
    /// `None` if the window does not cover `paddr`.
    #[must_use]
    pub const fn peripheral(self, paddr: Paddr) -> Option<u32> {
        match self {
            Self::Physical => Some(paddr.as_u32()),
            Self::Window => match physical_to_virtual(paddr) {
                Some(vaddr) => Some(vaddr.as_u32()),
                None => None,
            },
        }
    }
}

/// Reports fatal codes on a [`StatusLed`].
#[derive(Debug)]
pub struct LedReporter<L> {
    led: L,
}

impl<L: StatusLed> LedReporter<L> {
    /// Wraps an LED.
    pub const fn new(led: L) -> Self {
        Self { led }
    }
}

impl<L: StatusLed> FatalReporter for LedReporter<L> {
    fn report_fatal(&mut self, code: FatalCode) -> ! {
        self.led.set(false);
        loop {
            blink_code(&mut self.led, code);
        }
    }
}

/// One recorded LED action.
#[cfg(any(test, feature = "std"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedEvent {
    /// Switched on.
    On,
    /// Switched off.
    Off,
    /// Paused for the given units.
    Pause(u32),
}

/// LED that records what it was told to do.
#[cfg(any(test, feature = "std"))]
#[derive(Debug, Clone, Default)]
pub struct MockLed {
    events: std::vec::Vec<LedEvent>,
}

#[cfg(any(test, feature = "std"))]
impl MockLed {
    /// Creates a dark LED with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every action so far, oldest first.
    #[must_use]
    pub fn events(&self) -> &[LedEvent] {
        &self.events
    }

    /// How often the LED was switched on.
    #[must_use]
    pub fn blinks(&self) -> usize {
        self.events
            .iter()
            .filter(|event| **event == LedEvent::On)
            .count()
    }
}

#[cfg(any(test, feature = "std"))]
impl StatusLed for MockLed {
    fn set(&mut self, lit: bool) {
        self.events
            .push(if lit { LedEvent::On } else { LedEvent::Off });
    }

    fn pause(&mut self, units: u32) {
        self.events.push(LedEvent::Pause(units));
    }
}
