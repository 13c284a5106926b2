// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Fatal diagnostic codes.
//!
//! Before the console exists the only output device is the OK LED. An
//! unrecoverable bring-up failure is reported by blinking the LED
//! [`FatalCode::blink_count`] times, pausing, and repeating forever.

use core::fmt;

/// Reason an unrecoverable boot failure was reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FatalCode {
    /// The display-size query failed.
    DisplaySizeQuery = 1,
    /// The firmware returned an unusable display size.
    InvalidDisplaySize = 2,
    /// The framebuffer setup message was rejected.
    FramebufferSetup = 3,
    /// The setup response carried a malformed tag list.
    InvalidTagList = 4,
    /// The allocate-framebuffer tag was not answered correctly.
    InvalidFramebufferResponse = 5,
    /// The framebuffer base address or size was zero.
    InvalidFramebufferData = 6,
    /// The pitch query was not answered correctly.
    InvalidPitchResponse = 7,
    /// The firmware reported a zero pitch.
    InvalidPitchData = 8,
    /// A page-table lifecycle step ran out of order.
    PageTableLifecycle = 9,
    /// The mailbox buffer has no physical translation.
    MailboxBufferUnmapped = 10,
    /// The kernel panicked after bring-up started.
    KernelPanic = 11,
}

impl FatalCode {
    /// Number of LED blinks in one report cycle.
    #[inline]
    #[must_use]
    pub const fn blink_count(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for FatalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::DisplaySizeQuery => "display size query failed",
            Self::InvalidDisplaySize => "invalid display size",
            Self::FramebufferSetup => "framebuffer setup failed",
            Self::InvalidTagList => "invalid response tag list",
            Self::InvalidFramebufferResponse => "invalid framebuffer tag response",
            Self::InvalidFramebufferData => "invalid framebuffer address or size",
            Self::InvalidPitchResponse => "invalid pitch response",
            Self::InvalidPitchData => "invalid pitch value",
            Self::PageTableLifecycle => "page table lifecycle violation",
            Self::MailboxBufferUnmapped => "mailbox buffer not mapped",
            Self::KernelPanic => "kernel panic",
        };
        write!(f, "fatal {}: {text}", self.blink_count())
    }
}
