// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # pibare mailbox
//!
//! The ARM side of the VideoCore property-tag protocol.
//!
//! This crate provides:
//! - [`MailboxChannel`], the blocking one-word channel, with the BCM2835
//!   register driver
//! - [`PropertyBuffer`], the 16-byte aligned message shared with the firmware
//! - [`build_request`] and [`find_tag`] for message framing
//! - [`PropertyClient`], which runs one validated exchange at a time, plus
//!   typed queries and framebuffer negotiation on top of it
//!
//! The client never sees hardware directly: the channel and the buffer's bus
//! address are capabilities, so everything runs on the host against
//! [`MockFirmware`].

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod buffer;
pub mod channel;
pub mod client;
pub mod error;
pub mod framebuffer;
pub mod message;
pub mod queries;

#[cfg(any(test, feature = "std"))]
pub mod mock;

#[cfg(test)]
mod framebuffer_test;

pub use buffer::PropertyBuffer;
pub use channel::{Bcm2835Mailbox, MailboxChannel};
pub use client::{BusAddress, FixedAddress, PropertyClient, Response};
pub use error::PropertyError;
pub use framebuffer::{Framebuffer, FramebufferError, FramebufferRequest};
pub use message::{Request, TagRef, TagRequest, build_request, find_tag};
pub use queries::{DisplaySize, MemoryRange, MemoryReport};

#[cfg(any(test, feature = "std"))]
pub use mock::{MockFirmware, serve_tags};
