// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Message framing: laying tags into the buffer and finding them again.
//!
//! ```text
//! [0] size   [1] code
//! [2] id  [3] value size  [4] length  [5..5+n] value
//! ...
//! [k] 0
//! ```

use pibare_abi::TagId;
use pibare_abi::property::{
    MESSAGE_HEADER_WORDS, PROCESS_REQUEST, RESPONSE_BIT, RESPONSE_LENGTH_MASK, TAG_HEADER_WORDS,
    words_for,
};

use crate::buffer::PropertyBuffer;
use crate::error::PropertyError;

/// Most tags one request may carry.
pub const MAX_TAGS: usize = 8;

/// One tag to place into a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRequest<'a> {
    /// Tag identifier.
    pub id: TagId,
    /// Bytes reserved for the value (the larger of request and response).
    pub value_size: u32,
    /// Input values; the rest of the value buffer is zeroed.
    pub input: &'a [u32],
}

impl<'a> TagRequest<'a> {
    /// A query without input.
    #[must_use]
    pub const fn get(id: TagId, value_size: u32) -> Self {
        Self {
            id,
            value_size,
            input: &[],
        }
    }

    /// A request carrying `input`.
    #[must_use]
    pub const fn set(id: TagId, value_size: u32, input: &'a [u32]) -> Self {
        Self {
            id,
            value_size,
            input,
        }
    }

    /// Request length in bytes, as written into the length word.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "inputs are bounded by the 1 KiB buffer"
    )]
    const fn input_bytes(&self) -> u32 {
        (self.input.len() * 4) as u32
    }
}

/// Where a tag was placed, recorded at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TagSlot {
    /// Tag identifier.
    pub id: TagId,
    /// Word offset of the tag header.
    pub header: usize,
    /// Bytes reserved for the value.
    pub value_size: u32,
}

/// A request laid out in the buffer, ready for one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    slots: [TagSlot; MAX_TAGS],
    count: usize,
    size: u32,
}

impl Request {
    /// Tags in the order they were placed.
    #[must_use]
    pub fn tags(&self) -> &[TagSlot] {
        &self.slots[..self.count]
    }

    /// Total message size in bytes (word 0).
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Slot of the first tag with `id`.
    #[must_use]
    pub fn slot(&self, id: TagId) -> Option<TagSlot> {
        self.tags().iter().copied().find(|slot| slot.id == id)
    }
}

/// Lays `tags` contiguously into `buffer`.
///
/// Value buffers are zeroed before the inputs are copied in, the length word
/// carries the input size, and an end tag follows the last tag. Word 0 gets
/// the total size, word 1 the request code.
///
/// # Errors
///
/// [`PropertyError::BufferOverflow`] when the tags (plus header and end tag)
/// exceed the buffer, when more than [`MAX_TAGS`] tags are given, or when an
/// input does not fit its value buffer.
pub fn build_request(
    buffer: &PropertyBuffer,
    tags: &[TagRequest<'_>],
) -> Result<Request, PropertyError> {
    if tags.len() > MAX_TAGS {
        return Err(PropertyError::BufferOverflow {
            needed: tags.len(),
            capacity: MAX_TAGS,
        });
    }

    let mut request = Request {
        slots: [TagSlot::default(); MAX_TAGS],
        count: 0,
        size: 0,
    };

    let mut cursor = MESSAGE_HEADER_WORDS;
    for tag in tags {
        let value_words = words_for(tag.value_size);
        if tag.input.len() > value_words {
            return Err(PropertyError::BufferOverflow {
                needed: tag.input.len(),
                capacity: value_words,
            });
        }
        let next = cursor + TAG_HEADER_WORDS + value_words;
        if next + 1 > buffer.capacity() {
            return Err(PropertyError::BufferOverflow {
                needed: next + 1,
                capacity: buffer.capacity(),
            });
        }

        buffer.set(cursor, tag.id.as_u32())?;
        buffer.set(cursor + 1, tag.value_size)?;
        buffer.set(cursor + 2, tag.input_bytes())?;
        let payload = cursor + TAG_HEADER_WORDS;
        for index in 0..value_words {
            let value = tag.input.get(index).copied().unwrap_or(0);
            buffer.set(payload + index, value)?;
        }

        request.slots[request.count] = TagSlot {
            id: tag.id,
            header: cursor,
            value_size: tag.value_size,
        };
        request.count += 1;
        cursor = next;
    }

    buffer.set(cursor, TagId::END.as_u32())?;
    let words = cursor + 1;
    #[expect(
        clippy::cast_possible_truncation,
        reason = "bounded by the 1 KiB buffer"
    )]
    let size = (words * 4) as u32;
    buffer.set(0, size)?;
    buffer.set(1, PROCESS_REQUEST)?;
    request.size = size;

    log::trace!("property request: {} tags, {size} bytes", request.count);
    Ok(request)
}

/// A tag located in a buffer by [`find_tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRef {
    /// Tag identifier.
    pub id: TagId,
    /// Word offset of the tag header.
    pub header: usize,
    /// Value buffer size in bytes.
    pub value_size: u32,
    /// Raw length word (response bit and length).
    pub length: u32,
}

impl TagRef {
    /// Word offset of the first value word.
    #[inline]
    #[must_use]
    pub const fn payload(&self) -> usize {
        self.header + TAG_HEADER_WORDS
    }

    /// Words in the value buffer.
    #[inline]
    #[must_use]
    pub const fn value_words(&self) -> usize {
        words_for(self.value_size)
    }

    /// Checks the response bit of the length word.
    #[inline]
    #[must_use]
    pub const fn is_response(&self) -> bool {
        (self.length & RESPONSE_BIT) != 0
    }

    /// Response length in bytes.
    #[inline]
    #[must_use]
    pub const fn response_len(&self) -> u32 {
        self.length & RESPONSE_LENGTH_MASK
    }

    /// Checks a firmware answer against the reserved value buffer.
    ///
    /// # Errors
    ///
    /// [`PropertyError::BadResponseCode`] without the response bit,
    /// [`PropertyError::ShortResponse`] if the answer is longer than the
    /// value buffer.
    pub const fn validate(&self, reserved: u32) -> Result<(), PropertyError> {
        if !self.is_response() {
            return Err(PropertyError::BadResponseCode {
                tag: Some(self.id),
                code: self.length,
            });
        }
        if self.response_len() > reserved {
            return Err(PropertyError::ShortResponse {
                tag: self.id,
                length: self.response_len(),
                reserved,
            });
        }
        Ok(())
    }
}

/// Finds the first tag with `id` in `buffer`.
///
/// The scan starts at word 2 and steps over each tag's header and value
/// buffer. It is bounded by the declared message size (word 0), clamped to
/// the buffer capacity; sizes written by the firmware are never trusted past
/// that bound.
///
/// # Errors
///
/// - [`PropertyError::TagNotFound`] when the end tag is reached
/// - [`PropertyError::TruncatedTagScan`] when the bound is reached first, or
///   the matching tag's value buffer crosses it
pub fn find_tag(buffer: &PropertyBuffer, id: TagId) -> Result<TagRef, PropertyError> {
    let declared = buffer.get(0).map_or(0, words_for);
    let bound = declared.min(buffer.capacity());
    let truncated = |offset| PropertyError::TruncatedTagScan { offset };

    let mut cursor = MESSAGE_HEADER_WORDS;
    loop {
        if cursor >= bound {
            return Err(truncated(cursor));
        }
        let found = TagId::new(buffer.get(cursor).ok_or(truncated(cursor))?);
        if found.is_end() {
            return Err(PropertyError::TagNotFound { tag: id });
        }
        if cursor + TAG_HEADER_WORDS > bound {
            return Err(truncated(cursor));
        }
        let value_size = buffer.get(cursor + 1).ok_or(truncated(cursor))?;
        let next = cursor
            .checked_add(TAG_HEADER_WORDS + words_for(value_size))
            .ok_or(truncated(cursor))?;

        if found == id {
            if next > bound {
                return Err(truncated(cursor));
            }
            let length = buffer.get(cursor + 2).ok_or(truncated(cursor))?;
            return Ok(TagRef {
                id,
                header: cursor,
                value_size,
                length,
            });
        }
        cursor = next;
    }
}
