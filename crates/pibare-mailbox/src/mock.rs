// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Simulated VideoCore for host tests.
//!
//! [`MockFirmware`] implements [`MailboxChannel`]: posting the expected
//! buffer address runs a closure over the shared buffer, exactly where the
//! real firmware would rewrite it, and the next receive hands the address
//! back. [`serve_tags`] is the well-behaved firmware most closures delegate
//! to.

use std::vec::Vec;

use pibare_abi::property::{
    MESSAGE_HEADER_WORDS, PROPERTY_CHANNEL, RESPONSE_BIT, RESPONSE_SUCCESS, TAG_HEADER_WORDS,
    words_for,
};
use pibare_abi::{Paddr, TagId};

use crate::buffer::{BUFFER_WORDS, PropertyBuffer};
use crate::channel::MailboxChannel;

/// A mailbox whose far end is a closure.
pub struct MockFirmware<'b, F> {
    buffer: &'b PropertyBuffer,
    address: Paddr,
    firmware: F,
    pending: Option<(u8, Paddr)>,
    sent: Vec<(u8, Paddr)>,
}

impl<'b, F: FnMut(&PropertyBuffer)> MockFirmware<'b, F> {
    /// Creates a firmware answering requests for `buffer` posted at
    /// `address`.
    pub fn new(buffer: &'b PropertyBuffer, address: Paddr, firmware: F) -> Self {
        Self {
            buffer,
            address,
            firmware,
            pending: None,
            sent: Vec::new(),
        }
    }

    /// Every `(channel, address)` posted so far.
    #[must_use]
    pub fn sent(&self) -> &[(u8, Paddr)] {
        &self.sent
    }
}

impl<F: FnMut(&PropertyBuffer)> MailboxChannel for MockFirmware<'_, F> {
    fn send(&mut self, channel: u8, address: Paddr) {
        self.sent.push((channel, address));
        if channel == PROPERTY_CHANNEL && address == self.address {
            (self.firmware)(self.buffer);
        }
        self.pending = Some((channel, address));
    }

    fn recv(&mut self, channel: u8) -> Paddr {
        // The real mailbox would block forever; the mock answers with a
        // null address instead.
        match self.pending.take() {
            Some((posted, address)) if posted == channel => address,
            _ => Paddr::null(),
        }
    }
}

/// Answers every tag in `buffer` the way the firmware does.
///
/// `answer` sees each tag's id and value words (request input on entry) and
/// returns the response length in bytes, or `None` to leave the tag
/// unanswered. Word 1 becomes `0x8000_0000`.
pub fn serve_tags(buffer: &PropertyBuffer, mut answer: impl FnMut(TagId, &mut [u32]) -> Option<u32>) {
    let bound = buffer.get(0).map_or(0, words_for).min(BUFFER_WORDS);
    let mut cursor = MESSAGE_HEADER_WORDS;
    let mut value = [0_u32; BUFFER_WORDS];

    while cursor + TAG_HEADER_WORDS <= bound {
        let id = TagId::new(buffer.get(cursor).unwrap_or(0));
        if id.is_end() {
            break;
        }
        let words = words_for(buffer.get(cursor + 1).unwrap_or(0));
        let payload = cursor + TAG_HEADER_WORDS;
        if payload + words > bound {
            break;
        }

        for (index, slot) in value[..words].iter_mut().enumerate() {
            *slot = buffer.get(payload + index).unwrap_or(0);
        }
        let length = answer(id, &mut value[..words]);
        for (index, word) in value[..words].iter().enumerate() {
            let _ = buffer.set(payload + index, *word);
        }
        if let Some(length) = length {
            let _ = buffer.set(cursor + 2, RESPONSE_BIT | length);
        }
        cursor = payload + words;
    }

    let _ = buffer.set(1, RESPONSE_SUCCESS);
}
