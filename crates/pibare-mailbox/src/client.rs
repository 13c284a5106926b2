// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The property protocol client.
//!
//! One exchange is strictly synchronous: build the request into the shared
//! buffer, post its bus address on channel 8, block until the firmware hands
//! the buffer back, then validate the answer before anyone reads a value.

use core::fmt;

use pibare_abi::property::{PROPERTY_CHANNEL, RESPONSE_SUCCESS};
use pibare_abi::{Paddr, TagId};
use pibare_mmu::AddressTranslator;

use crate::buffer::PropertyBuffer;
use crate::channel::MailboxChannel;
use crate::error::PropertyError;
use crate::message::{Request, TagRef, TagRequest, build_request, find_tag};

/// Alignment the mailbox requires for a buffer address.
pub const BUFFER_ALIGN: u32 = 16;

/// Resolves the physical (bus) address of the shared buffer.
pub trait BusAddress {
    /// Physical address of `buffer`.
    ///
    /// # Errors
    ///
    /// [`PropertyError::Translation`] if the buffer is not mapped.
    fn bus_address(&self, buffer: &PropertyBuffer) -> Result<Paddr, PropertyError>;
}

impl BusAddress for AddressTranslator<'_> {
    fn bus_address(&self, buffer: &PropertyBuffer) -> Result<Paddr, PropertyError> {
        self.translate_ptr(buffer.as_ptr())
            .map_err(PropertyError::from)
    }
}

/// A buffer whose physical address is known up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedAddress(pub Paddr);

impl BusAddress for FixedAddress {
    fn bus_address(&self, _buffer: &PropertyBuffer) -> Result<Paddr, PropertyError> {
        Ok(self.0)
    }
}

/// Drives property exchanges over a mailbox channel.
///
/// Owns the channel and borrows the buffer for its whole lifetime: one
/// client, one buffer, one request in flight.
pub struct PropertyClient<'b, M, B> {
    mailbox: M,
    resolver: B,
    buffer: &'b PropertyBuffer,
}

impl<'b, M: MailboxChannel, B: BusAddress> PropertyClient<'b, M, B> {
    /// Creates a client.
    pub const fn new(mailbox: M, resolver: B, buffer: &'b PropertyBuffer) -> Self {
        Self {
            mailbox,
            resolver,
            buffer,
        }
    }

    /// The shared buffer.
    #[must_use]
    pub const fn buffer(&self) -> &'b PropertyBuffer {
        self.buffer
    }

    /// The mailbox channel.
    pub const fn mailbox(&self) -> &M {
        &self.mailbox
    }

    /// Builds `tags` into the buffer and executes the request.
    ///
    /// # Errors
    ///
    /// See [`build_request`] and [`Self::execute`].
    pub fn query(&mut self, tags: &[TagRequest<'_>]) -> Result<Response<'b>, PropertyError> {
        let request = build_request(self.buffer, tags)?;
        self.execute(&request)
    }

    /// Hands the buffer to the firmware and validates the answer.
    ///
    /// Blocks until the firmware replies; there is no timeout.
    ///
    /// # Errors
    ///
    /// - [`PropertyError::Translation`] / [`PropertyError::UnalignedBuffer`]
    ///   if the buffer cannot be handed over
    /// - [`PropertyError::UnexpectedReply`] if another buffer comes back
    /// - [`PropertyError::BadResponseCode`] if word 1 is not `0x8000_0000`,
    ///   or a requested tag lacks the response bit
    /// - [`PropertyError::ShortResponse`] if a tag's answer exceeds the value
    ///   buffer reserved for it
    pub fn execute(&mut self, request: &Request) -> Result<Response<'b>, PropertyError> {
        let address = self.resolver.bus_address(self.buffer)?;
        if !address.is_aligned(BUFFER_ALIGN) {
            return Err(PropertyError::UnalignedBuffer { address });
        }

        self.mailbox.send(PROPERTY_CHANNEL, address);
        let received = self.mailbox.recv(PROPERTY_CHANNEL);
        if received != address {
            return Err(PropertyError::UnexpectedReply {
                expected: address,
                received,
            });
        }

        let code = self.buffer.get(1).unwrap_or(0);
        if code != RESPONSE_SUCCESS {
            return Err(PropertyError::BadResponseCode { tag: None, code });
        }
        for slot in request.tags() {
            let tag = TagRef {
                id: slot.id,
                header: slot.header,
                value_size: slot.value_size,
                length: self.buffer.get(slot.header + 2).unwrap_or(0),
            };
            tag.validate(slot.value_size)?;
            log::trace!("{}: {} bytes", slot.id, tag.response_len());
        }

        Ok(Response {
            buffer: self.buffer,
            request: *request,
        })
    }
}

impl<M, B> fmt::Debug for PropertyClient<'_, M, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyClient")
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}

/// A validated firmware answer.
///
/// Reads the shared buffer lazily: valid until the next request overwrites
/// it.
#[derive(Debug, Clone, Copy)]
pub struct Response<'b> {
    buffer: &'b PropertyBuffer,
    request: Request,
}

impl Response<'_> {
    /// The request this answers.
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// Locates an answered tag.
    ///
    /// The tag is found by scanning the buffer, not by trusting build-time
    /// offsets. Its answer is checked against the value buffer reserved when
    /// the request was built; a value-size word rewritten by the firmware is
    /// ignored.
    ///
    /// # Errors
    ///
    /// [`PropertyError::TagNotFound`] for a tag the request did not carry,
    /// otherwise see [`find_tag`] and [`TagRef::validate`].
    pub fn tag(&self, id: TagId) -> Result<TagRef, PropertyError> {
        let reserved = self
            .request
            .slot(id)
            .ok_or(PropertyError::TagNotFound { tag: id })?
            .value_size;
        let mut tag = find_tag(self.buffer, id)?;
        tag.validate(reserved)?;
        tag.value_size = reserved;
        Ok(tag)
    }

    /// Value word `index` of an answered tag.
    ///
    /// # Errors
    ///
    /// [`PropertyError::InvalidPayload`] if the answer is too short to
    /// contain the word.
    pub fn word(&self, tag: &TagRef, index: usize) -> Result<u32, PropertyError> {
        let answered = tag.response_len() as usize;
        if (index + 1) * 4 > answered || index >= tag.value_words() {
            return Err(PropertyError::InvalidPayload { tag: tag.id });
        }
        self.buffer
            .get(tag.payload() + index)
            .ok_or(PropertyError::InvalidPayload { tag: tag.id })
    }

    /// Copies the answered value bytes into `out`, returning how many were
    /// copied.
    pub fn copy_bytes(&self, tag: &TagRef, out: &mut [u8]) -> usize {
        let answered = (tag.response_len() as usize).min(tag.value_words() * 4);
        let len = answered.min(out.len());
        for (index, byte) in out[..len].iter_mut().enumerate() {
            let word = self.buffer.get(tag.payload() + index / 4).unwrap_or(0);
            *byte = word.to_le_bytes()[index % 4];
        }
        len
    }
}
