// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Framebuffer negotiation.
//!
//! Three exchanges:
//!
//! 1. get-physical-display-size; `0x0` means the emulator, which gets
//!    640x480 instead
//! 2. set-physical-size, set-virtual-size, set-depth and
//!    allocate-framebuffer in one message
//! 3. get-pitch
//!
//! Each failure maps onto the fatal code blinked when the display cannot
//! come up.

use core::fmt;

use pibare_abi::layout::physical_to_virtual;
use pibare_abi::property::RESPONSE_BIT;
use pibare_abi::{FatalCode, Paddr, TagId, Vaddr};

use crate::channel::MailboxChannel;
use crate::client::{BusAddress, PropertyClient};
use crate::error::PropertyError;
use crate::message::TagRequest;
use crate::queries::DisplaySize;

/// Geometry requested when the firmware reports no display.
pub const EMULATOR_FALLBACK: DisplaySize = DisplaySize {
    width: 640,
    height: 480,
};

/// Bits of a VideoCore bus address that select a cache alias rather than
/// a physical location.
const BUS_ALIAS_MASK: u32 = 0xC000_0000;

/// Caller-chosen framebuffer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferRequest {
    /// Bits per pixel.
    pub depth: u32,
    /// Required alignment of the framebuffer base in bytes.
    pub alignment: u32,
}

impl Default for FramebufferRequest {
    fn default() -> Self {
        Self {
            depth: 16,
            alignment: 16,
        }
    }
}

/// A negotiated framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framebuffer {
    /// Pixels per line.
    pub width: u32,
    /// Lines.
    pub height: u32,
    /// Bits per pixel.
    pub depth: u32,
    /// Bytes per line.
    pub pitch: u32,
    /// Physical base.
    pub base: Paddr,
    /// Size in bytes.
    pub size: u32,
    /// Base as seen through the physical window.
    pub virt: Vaddr,
}

/// Step at which negotiation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferError {
    /// The display-size exchange failed.
    DisplaySizeQuery(PropertyError),
    /// Exactly one display dimension is zero.
    InvalidDisplaySize(DisplaySize),
    /// The setup exchange was rejected.
    Setup(PropertyError),
    /// The setup answer's tag list could not be walked.
    InvalidTagList(PropertyError),
    /// The allocate tag was answered with the wrong length.
    InvalidAllocation {
        /// The length word found.
        length: u32,
    },
    /// The allocation is empty or outside the physical window.
    InvalidAllocationData {
        /// Reported base.
        base: u32,
        /// Reported size.
        size: u32,
    },
    /// The pitch exchange failed or carried no valid answer.
    PitchResponse(PropertyError),
    /// The firmware reported a zero pitch.
    InvalidPitch,
}

impl FramebufferError {
    /// Code blinked for this failure.
    #[must_use]
    pub const fn fatal_code(&self) -> FatalCode {
        match self {
            Self::DisplaySizeQuery(_) => FatalCode::DisplaySizeQuery,
            Self::InvalidDisplaySize(_) => FatalCode::InvalidDisplaySize,
            Self::Setup(_) => FatalCode::FramebufferSetup,
            Self::InvalidTagList(_) => FatalCode::InvalidTagList,
            Self::InvalidAllocation { .. } => FatalCode::InvalidFramebufferResponse,
            Self::InvalidAllocationData { .. } => FatalCode::InvalidFramebufferData,
            Self::PitchResponse(_) => FatalCode::InvalidPitchResponse,
            Self::InvalidPitch => FatalCode::InvalidPitchData,
        }
    }
}

impl fmt::Display for FramebufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DisplaySizeQuery(err) => write!(f, "display size query: {err}"),
            Self::InvalidDisplaySize(size) => write!(f, "invalid display size {size}"),
            Self::Setup(err) => write!(f, "framebuffer setup: {err}"),
            Self::InvalidTagList(err) => write!(f, "framebuffer tag list: {err}"),
            Self::InvalidAllocation { length } => {
                write!(f, "allocate-framebuffer answered with length {length:#010x}")
            }
            Self::InvalidAllocationData { base, size } => {
                write!(f, "unusable framebuffer at {base:#010x}, {size} bytes")
            }
            Self::PitchResponse(err) => write!(f, "pitch query: {err}"),
            Self::InvalidPitch => write!(f, "zero pitch"),
        }
    }
}

/// Sorts a setup error into the step it belongs to.
const fn classify_setup_error(err: PropertyError) -> FramebufferError {
    match err {
        PropertyError::BadResponseCode {
            tag: Some(tag),
            code,
        } if tag.as_u32() == TagId::ALLOCATE_FRAMEBUFFER.as_u32() => {
            FramebufferError::InvalidAllocation { length: code }
        }
        PropertyError::ShortResponse { tag, length, .. }
            if tag.as_u32() == TagId::ALLOCATE_FRAMEBUFFER.as_u32() =>
        {
            FramebufferError::InvalidAllocation {
                length: RESPONSE_BIT | length,
            }
        }
        PropertyError::TruncatedTagScan { .. } | PropertyError::TagNotFound { .. } => {
            FramebufferError::InvalidTagList(err)
        }
        _ => FramebufferError::Setup(err),
    }
}

impl<M: MailboxChannel, B: BusAddress> PropertyClient<'_, M, B> {
    /// Negotiates a framebuffer at the display's native size.
    ///
    /// # Errors
    ///
    /// The first step that failed, see [`FramebufferError`].
    pub fn negotiate_framebuffer(
        &mut self,
        request: FramebufferRequest,
    ) -> Result<Framebuffer, FramebufferError> {
        let mut size = self
            .display_size()
            .map_err(FramebufferError::DisplaySizeQuery)?;
        if size.is_empty() {
            log::warn!("firmware reports no display size, assuming emulator at {EMULATOR_FALLBACK}");
            size = EMULATOR_FALLBACK;
        }
        if size.width == 0 || size.height == 0 {
            return Err(FramebufferError::InvalidDisplaySize(size));
        }

        let geometry = [size.width, size.height];
        let depth = [request.depth];
        let alignment = [request.alignment];
        let response = self
            .query(&[
                TagRequest::set(TagId::SET_PHYSICAL_SIZE, 8, &geometry),
                TagRequest::set(TagId::SET_VIRTUAL_SIZE, 8, &geometry),
                TagRequest::set(TagId::SET_DEPTH, 4, &depth),
                TagRequest::set(TagId::ALLOCATE_FRAMEBUFFER, 8, &alignment),
            ])
            .map_err(classify_setup_error)?;

        let allocation = response
            .tag(TagId::ALLOCATE_FRAMEBUFFER)
            .map_err(classify_setup_error)?;
        if allocation.response_len() != 8 {
            return Err(FramebufferError::InvalidAllocation {
                length: allocation.length,
            });
        }
        let raw_base = response
            .word(&allocation, 0)
            .map_err(FramebufferError::Setup)?;
        let fb_size = response
            .word(&allocation, 1)
            .map_err(FramebufferError::Setup)?;
        let base = Paddr::new(raw_base & !BUS_ALIAS_MASK);
        let virt = physical_to_virtual(base).filter(|_| !base.is_null() && fb_size != 0);
        let Some(virt) = virt else {
            return Err(FramebufferError::InvalidAllocationData {
                base: raw_base,
                size: fb_size,
            });
        };

        let pitch = self.pitch().map_err(|err| match err {
            PropertyError::InvalidPayload { .. } => FramebufferError::InvalidPitch,
            other => FramebufferError::PitchResponse(other),
        })?;

        let framebuffer = Framebuffer {
            width: size.width,
            height: size.height,
            depth: request.depth,
            pitch,
            base,
            size: fb_size,
            virt,
        };
        log::info!(
            "framebuffer {size} at {base} (virtual {virt}), {fb_size} bytes, pitch {pitch}"
        );
        Ok(framebuffer)
    }
}
