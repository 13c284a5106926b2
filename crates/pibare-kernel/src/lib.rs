// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # pibare kernel
//!
//! Boot sequence of a bare-metal kernel for the original Raspberry Pi
//! (BCM2835, ARM1176JZF-S).
//!
//! The firmware loads the image at physical `0x8000` and jumps to it with
//! the MMU off. From there:
//!
//! 1. [`boot::early_init`] builds the boot translation table and turns the
//!    MMU on, still running at physical addresses.
//! 2. The entry code jumps into the kernel code window at `0xF000_0000`.
//! 3. [`boot::kernel_main`] retires the identity window, negotiates a
//!    framebuffer with the VideoCore and reads the system report.
//!
//! Failures end in [`fatal::FatalReporter::report_fatal`], which blinks the
//! ACT LED forever. Everything except the entry assembly and the hardware
//! drivers runs on the host against the mocks in `pibare-mmu` and
//! `pibare-mailbox`.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod boot;
pub mod fatal;
#[cfg(target_arch = "arm")]
pub mod gpio;
pub mod logger;
pub mod uart;

#[cfg(test)]
mod fatal_test;

pub use boot::{BootReport, CommandLine, early_init, kernel_main};
pub use fatal::{FatalReporter, LedReporter, ReportSpace, StatusLed, blink_code};
pub use logger::UartLogger;
pub use uart::UartWriter;

#[cfg(any(test, feature = "std"))]
pub use fatal::{LedEvent, MockLed};
#[cfg(any(test, feature = "std"))]
pub use uart::MockUart;

/// Crate version.
pub const VERSION: &str = match option_env!("PIBARE_VERSION") {
    Some(v) => v,
    None => "unknown",
};
