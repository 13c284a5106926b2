// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Property protocol errors.

use core::fmt;

use pibare_abi::{Paddr, TagId};
use pibare_mmu::TranslationError;

/// Failure of a property-tag exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyError {
    /// The message code or a tag's length word lacks the response bit, or
    /// the firmware reported a parse error.
    BadResponseCode {
        /// Tag whose length word was wrong; `None` for the message code.
        tag: Option<TagId>,
        /// The word found in place of a response.
        code: u32,
    },
    /// A tag scan reached the declared message size without an end tag.
    TruncatedTagScan {
        /// Word offset at which the scan stopped.
        offset: usize,
    },
    /// The firmware claims a response longer than the value buffer reserved
    /// for it.
    ShortResponse {
        /// Offending tag.
        tag: TagId,
        /// Response length in bytes.
        length: u32,
        /// Value buffer size reserved at build time.
        reserved: u32,
    },
    /// The scan completed without finding the tag.
    TagNotFound {
        /// Tag that was looked for.
        tag: TagId,
    },
    /// The request does not fit into the shared buffer.
    BufferOverflow {
        /// Words the request needs.
        needed: usize,
        /// Words available.
        capacity: usize,
    },
    /// The buffer's bus address is not 16-byte aligned.
    UnalignedBuffer {
        /// Offending address.
        address: Paddr,
    },
    /// The buffer has no physical backing.
    Translation(TranslationError),
    /// The mailbox answered with a different buffer address.
    UnexpectedReply {
        /// Address that was sent.
        expected: Paddr,
        /// Address that came back.
        received: Paddr,
    },
    /// The response is well formed but its value is unusable.
    InvalidPayload {
        /// Tag carrying the value.
        tag: TagId,
    },
}

impl From<TranslationError> for PropertyError {
    fn from(err: TranslationError) -> Self {
        Self::Translation(err)
    }
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadResponseCode { tag: None, code } => {
                write!(f, "bad response code {code:#010x}")
            }
            Self::BadResponseCode {
                tag: Some(tag),
                code,
            } => write!(f, "{tag}: bad response length {code:#010x}"),
            Self::TruncatedTagScan { offset } => {
                write!(f, "tag scan ran past message end at word {offset}")
            }
            Self::ShortResponse {
                tag,
                length,
                reserved,
            } => write!(f, "{tag}: response of {length} bytes exceeds {reserved} reserved"),
            Self::TagNotFound { tag } => write!(f, "{tag}: not in response"),
            Self::BufferOverflow { needed, capacity } => {
                write!(f, "request needs {needed} words, buffer holds {capacity}")
            }
            Self::UnalignedBuffer { address } => {
                write!(f, "buffer at {address} not 16-byte aligned")
            }
            Self::Translation(err) => write!(f, "buffer address: {err}"),
            Self::UnexpectedReply { expected, received } => {
                write!(f, "mailbox replied {received}, expected {expected}")
            }
            Self::InvalidPayload { tag } => write!(f, "{tag}: unusable value"),
        }
    }
}
