// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the blink patterns.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::fatal::*;
use pibare_abi::{FatalCode, Paddr};
use pibare_mmu::{MockSystemControl, SystemControl};
use proptest::prelude::*;

const CODES: [FatalCode; 11] = [
    FatalCode::DisplaySizeQuery,
    FatalCode::InvalidDisplaySize,
    FatalCode::FramebufferSetup,
    FatalCode::InvalidTagList,
    FatalCode::InvalidFramebufferResponse,
    FatalCode::InvalidFramebufferData,
    FatalCode::InvalidPitchResponse,
    FatalCode::InvalidPitchData,
    FatalCode::PageTableLifecycle,
    FatalCode::MailboxBufferUnmapped,
    FatalCode::KernelPanic,
];

#[test]
fn test_burst_pattern() {
    let mut led = MockLed::new();
    blink_code(&mut led, FatalCode::FramebufferSetup);

    let blink = [
        LedEvent::On,
        LedEvent::Pause(BLINK_ON),
        LedEvent::Off,
        LedEvent::Pause(BLINK_OFF),
    ];
    let mut expected = blink.repeat(3);
    expected.push(LedEvent::Pause(BURST_GAP));
    assert_eq!(led.events(), expected.as_slice());
}

proptest! {
    #[test]
    fn burst_blinks_code_times(index in 0_usize..CODES.len()) {
        let code = CODES[index];
        let mut led = MockLed::new();
        blink_code(&mut led, code);

        prop_assert_eq!(led.blinks(), code.blink_count() as usize);
        prop_assert_eq!(led.blinks(), index + 1);
        prop_assert_eq!(led.events().last(), Some(&LedEvent::Pause(BURST_GAP)));
    }
}

/// An LED that gives up after a number of bursts, so `report_fatal` can be
/// observed from a test.
struct CountingLed {
    inner: MockLed,
    bursts_left: u32,
}

impl StatusLed for CountingLed {
    fn set(&mut self, lit: bool) {
        self.inner.set(lit);
    }

    fn pause(&mut self, units: u32) {
        self.inner.pause(units);
        if units == BURST_GAP {
            self.bursts_left -= 1;
            assert!(self.bursts_left > 0, "{} blinks", self.inner.blinks());
        }
    }
}

#[test]
#[should_panic(expected = "4 blinks")]
fn test_report_fatal_repeats_bursts() {
    let led = CountingLed {
        inner: MockLed::new(),
        bursts_left: 2,
    };
    LedReporter::new(led).report_fatal(FatalCode::InvalidDisplaySize);
}

#[test]
fn test_report_space_follows_mmu() {
    let mut regs = MockSystemControl::new();
    assert_eq!(ReportSpace::current(&regs), ReportSpace::Physical);
    assert!(!ReportSpace::Physical.can_log());

    regs.set_sctlr(regs.sctlr() | 1);
    assert_eq!(ReportSpace::current(&regs), ReportSpace::Window);
    assert!(ReportSpace::Window.can_log());
}

#[test]
fn test_report_space_peripheral_address() {
    let gpio = Paddr::new(0x2020_0000);
    assert_eq!(ReportSpace::Physical.peripheral(gpio), Some(0x2020_0000));
    assert_eq!(ReportSpace::Window.peripheral(gpio), Some(0xA020_0000));
    assert_eq!(ReportSpace::Window.peripheral(Paddr::new(0x2200_0000)), None);
}
