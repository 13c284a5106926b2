// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Typed single-purpose queries.

use core::fmt;

use pibare_abi::{Paddr, TagId};

use crate::channel::MailboxChannel;
use crate::client::{BusAddress, PropertyClient};
use crate::error::PropertyError;
use crate::message::TagRequest;

/// Value buffer reserved for the command line (195 words).
pub const COMMAND_LINE_BYTES: u32 = 195 * 4;

/// Display geometry in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySize {
    /// Pixels per line.
    pub width: u32,
    /// Lines.
    pub height: u32,
}

impl DisplaySize {
    /// Checks whether both dimensions are zero.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 && self.height == 0
    }
}

impl fmt::Display for DisplaySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A physical memory region reported by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRange {
    /// First byte.
    pub base: Paddr,
    /// Length in bytes.
    pub size: u32,
}

impl MemoryRange {
    /// Last byte (inclusive), or `None` for an empty range.
    #[must_use]
    pub const fn last(&self) -> Option<Paddr> {
        if self.size == 0 {
            return None;
        }
        Some(self.base.add(self.size - 1))
    }

    /// Size in whole MiB.
    #[must_use]
    pub const fn megabytes(&self) -> u32 {
        self.size / (1024 * 1024)
    }
}

impl fmt::Display for MemoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last() {
            Some(last) => write!(
                f,
                "{} - {} ({} bytes, {} MiB)",
                self.base,
                last,
                self.size,
                self.megabytes()
            ),
            None => write!(f, "{} (empty)", self.base),
        }
    }
}

/// How physical memory is split between ARM and VideoCore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReport {
    /// Memory owned by the ARM.
    pub arm: MemoryRange,
    /// Memory owned by the VideoCore.
    pub videocore: MemoryRange,
}

impl<M: MailboxChannel, B: BusAddress> PropertyClient<'_, M, B> {
    /// Queries the physical display size.
    ///
    /// The emulator answers `0x0`; the raw value is returned and the caller
    /// decides on a fallback.
    ///
    /// # Errors
    ///
    /// Any exchange or validation error.
    pub fn display_size(&mut self) -> Result<DisplaySize, PropertyError> {
        let response = self.query(&[TagRequest::get(TagId::GET_PHYSICAL_DISPLAY_SIZE, 8)])?;
        let tag = response.tag(TagId::GET_PHYSICAL_DISPLAY_SIZE)?;
        Ok(DisplaySize {
            width: response.word(&tag, 0)?,
            height: response.word(&tag, 1)?,
        })
    }

    /// Queries the framebuffer pitch in bytes per line.
    ///
    /// # Errors
    ///
    /// Any exchange or validation error; [`PropertyError::InvalidPayload`]
    /// for a zero pitch.
    pub fn pitch(&mut self) -> Result<u32, PropertyError> {
        let response = self.query(&[TagRequest::get(TagId::GET_PITCH, 4)])?;
        let tag = response.tag(TagId::GET_PITCH)?;
        let pitch = response.word(&tag, 0)?;
        if pitch == 0 {
            return Err(PropertyError::InvalidPayload { tag: tag.id });
        }
        Ok(pitch)
    }

    /// Reads the kernel command line into `out`.
    ///
    /// The line ends at the first NUL or at the end of the answer, whichever
    /// comes first. Lines longer than `out` are cut.
    ///
    /// # Errors
    ///
    /// Any exchange or validation error; [`PropertyError::InvalidPayload`]
    /// if the bytes are not UTF-8.
    pub fn command_line<'o>(&mut self, out: &'o mut [u8]) -> Result<&'o str, PropertyError> {
        let response = self.query(&[TagRequest::get(TagId::GET_COMMAND_LINE, COMMAND_LINE_BYTES)])?;
        let tag = response.tag(TagId::GET_COMMAND_LINE)?;
        let copied = response.copy_bytes(&tag, out);
        let end = out[..copied].iter().position(|&byte| byte == 0).unwrap_or(copied);
        core::str::from_utf8(&out[..end]).map_err(|_| PropertyError::InvalidPayload { tag: tag.id })
    }

    /// Queries ARM and VideoCore memory in one message.
    ///
    /// # Errors
    ///
    /// Any exchange or validation error.
    pub fn memory_report(&mut self) -> Result<MemoryReport, PropertyError> {
        let response = self.query(&[
            TagRequest::get(TagId::GET_ARM_MEMORY, 8),
            TagRequest::get(TagId::GET_VC_MEMORY, 8),
        ])?;
        let arm = response.tag(TagId::GET_ARM_MEMORY)?;
        let videocore = response.tag(TagId::GET_VC_MEMORY)?;
        Ok(MemoryReport {
            arm: MemoryRange {
                base: Paddr::new(response.word(&arm, 0)?),
                size: response.word(&arm, 1)?,
            },
            videocore: MemoryRange {
                base: Paddr::new(response.word(&videocore, 0)?),
                size: response.word(&videocore, 1)?,
            },
        })
    }
}
