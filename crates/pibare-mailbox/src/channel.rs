// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! BCM2835 mailbox 0: the ARM side of the VideoCore mailbox.
//!
//! A mailbox word combines a 16-byte aligned buffer address (bits `[31:4]`)
//! with a channel number (bits `[3:0]`). The hardware holds one word per
//! direction; a second request on the same channel before the reply has
//! been read is undefined.
//!
//! Neither direction has a timeout: an absent or wedged firmware hangs the
//! caller forever.

use core::ptr::{read_volatile, write_volatile};

use pibare_abi::Paddr;
use pibare_abi::layout::PERIPHERAL_BASE;

/// Physical base of the mailbox 0 register block.
pub const MAILBOX_PADDR: Paddr = PERIPHERAL_BASE.add(0xB880);

/// Read register offset.
const MAILBOX_READ: usize = 0x00;

/// Status register offset.
const MAILBOX_STATUS: usize = 0x18;

/// Write register offset.
const MAILBOX_WRITE: usize = 0x20;

/// Status bit: write register full.
pub const MAILBOX_FULL: u32 = 0x8000_0000;

/// Status bit: read register empty.
pub const MAILBOX_EMPTY: u32 = 0x4000_0000;

/// Mask of the channel nibble in a mailbox word.
pub const CHANNEL_MASK: u32 = 0xF;

/// Composes the word written to the mailbox.
#[inline]
#[must_use]
pub const fn mailbox_word(channel: u8, address: Paddr) -> u32 {
    (address.as_u32() & !CHANNEL_MASK) | (channel as u32 & CHANNEL_MASK)
}

/// Splits a word read from the mailbox into channel and address.
#[inline]
#[must_use]
pub const fn split_mailbox_word(word: u32) -> (u8, Paddr) {
    #[expect(clippy::cast_possible_truncation, reason = "masked to four bits")]
    let channel = (word & CHANNEL_MASK) as u8;
    (channel, Paddr::new(word & !CHANNEL_MASK))
}

/// One request/reply slot per channel to the VideoCore.
pub trait MailboxChannel {
    /// Posts `address` on `channel`, waiting while the write register is
    /// full.
    fn send(&mut self, channel: u8, address: Paddr);

    /// Waits for the next reply on `channel` and returns its address.
    /// Replies for other channels are discarded.
    fn recv(&mut self, channel: u8) -> Paddr;
}

impl<M: MailboxChannel + ?Sized> MailboxChannel for &mut M {
    fn send(&mut self, channel: u8, address: Paddr) {
        (**self).send(channel, address);
    }

    fn recv(&mut self, channel: u8) -> Paddr {
        (**self).recv(channel)
    }
}

/// Memory barrier required between accesses to different BCM2835
/// peripherals.
#[cfg(target_arch = "arm")]
#[inline]
fn peripheral_barrier() {
    // SAFETY: the ARMv6 data memory barrier ignores its operand.
    unsafe {
        core::arch::asm!("mcr p15, 0, {}, c7, c10, 5", in(reg) 0_u32, options(nostack, preserves_flags));
    }
}

#[cfg(not(target_arch = "arm"))]
#[inline]
fn peripheral_barrier() {
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}

/// The mailbox 0 register block, reached through a mapped virtual address.
#[derive(Debug)]
pub struct Bcm2835Mailbox {
    base: *mut u32,
}

impl Bcm2835Mailbox {
    /// Creates a driver for the registers at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the virtual address of the mailbox register block,
    /// mapped as device memory, and no other driver may use it.
    #[must_use]
    pub const unsafe fn new(base: *mut u32) -> Self {
        Self { base }
    }

    fn read(&self, offset: usize) -> u32 {
        // SAFETY: `new` guarantees the register block is mapped.
        unsafe { read_volatile(self.base.add(offset / 4)) }
    }

    fn write(&self, offset: usize, value: u32) {
        // SAFETY: `new` guarantees the register block is mapped.
        unsafe { write_volatile(self.base.add(offset / 4), value) }
    }
}

impl MailboxChannel for Bcm2835Mailbox {
    fn send(&mut self, channel: u8, address: Paddr) {
        peripheral_barrier();
        while self.read(MAILBOX_STATUS) & MAILBOX_FULL != 0 {
            core::hint::spin_loop();
        }
        self.write(MAILBOX_WRITE, mailbox_word(channel, address));
        peripheral_barrier();
    }

    fn recv(&mut self, channel: u8) -> Paddr {
        peripheral_barrier();
        loop {
            while self.read(MAILBOX_STATUS) & MAILBOX_EMPTY != 0 {
                core::hint::spin_loop();
            }
            let (from, address) = split_mailbox_word(self.read(MAILBOX_READ));
            if from == channel {
                peripheral_barrier();
                return address;
            }
        }
    }
}
