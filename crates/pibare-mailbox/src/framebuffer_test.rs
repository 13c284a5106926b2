// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for framebuffer negotiation against a scripted firmware.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::buffer::PropertyBuffer;
use super::client::{FixedAddress, PropertyClient};
use super::error::PropertyError;
use super::framebuffer::*;
use super::mock::{MockFirmware, serve_tags};
use super::queries::DisplaySize;
use pibare_abi::{FatalCode, Paddr, TagId, Vaddr};

const ADDR: Paddr = Paddr::new(0x0010_0000);

/// What the scripted firmware answers.
#[derive(Clone, Copy)]
struct Script {
    display: [u32; 2],
    allocation: [u32; 2],
    allocation_length: Option<u32>,
    pitch: u32,
    pitch_length: Option<u32>,
    drop_allocate: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            display: [0, 0],
            allocation: [0x5C00_6000, 0x0009_6000],
            allocation_length: Some(8),
            pitch: 1280,
            pitch_length: Some(4),
            drop_allocate: false,
        }
    }
}

/// Runs a negotiation, returning the outcome and every `(tag, input)` the
/// firmware saw.
fn negotiate(script: Script) -> (Result<Framebuffer, FramebufferError>, Vec<(TagId, Vec<u32>)>) {
    let buffer = PropertyBuffer::new();
    let mut seen = Vec::new();
    let result = {
        let firmware = |buffer: &PropertyBuffer| {
            if script.drop_allocate {
                // Replace the allocate tag id so the scan cannot find it.
                for index in 0..buffer.capacity() {
                    if buffer.get(index) == Some(TagId::ALLOCATE_FRAMEBUFFER.as_u32()) {
                        buffer.set(index, 0x0004_0002).unwrap();
                    }
                }
            }
            serve_tags(buffer, |id, value| {
                seen.push((id, value.to_vec()));
                match id {
                    TagId::GET_PHYSICAL_DISPLAY_SIZE => {
                        value.copy_from_slice(&script.display);
                        Some(8)
                    }
                    TagId::SET_PHYSICAL_SIZE | TagId::SET_VIRTUAL_SIZE => Some(8),
                    TagId::SET_DEPTH => Some(4),
                    TagId::ALLOCATE_FRAMEBUFFER => {
                        value.copy_from_slice(&script.allocation);
                        script.allocation_length
                    }
                    TagId::GET_PITCH => {
                        value[0] = script.pitch;
                        script.pitch_length
                    }
                    _ => Some(u32::try_from(value.len() * 4).unwrap()),
                }
            });
        };
        let mailbox = MockFirmware::new(&buffer, ADDR, firmware);
        let mut client = PropertyClient::new(mailbox, FixedAddress(ADDR), &buffer);
        client.negotiate_framebuffer(FramebufferRequest::default())
    };
    (result, seen)
}

fn fatal(script: Script) -> FatalCode {
    negotiate(script).0.unwrap_err().fatal_code()
}

#[test]
fn test_emulator_fallback() {
    let (result, seen) = negotiate(Script::default());
    let framebuffer = result.unwrap();

    assert_eq!(framebuffer.width, 640);
    assert_eq!(framebuffer.height, 480);
    assert_eq!(framebuffer.depth, 16);
    assert_eq!(framebuffer.pitch, 1280);
    assert_eq!(framebuffer.base, Paddr::new(0x1C00_6000));
    assert_eq!(framebuffer.virt, Vaddr::new(0x9C00_6000));
    assert_eq!(framebuffer.size, 0x0009_6000);

    let inputs: Vec<_> = seen.iter().map(|(id, value)| (*id, value[0])).collect();
    assert_eq!(
        inputs,
        [
            (TagId::GET_PHYSICAL_DISPLAY_SIZE, 0),
            (TagId::SET_PHYSICAL_SIZE, 640),
            (TagId::SET_VIRTUAL_SIZE, 640),
            (TagId::SET_DEPTH, 16),
            (TagId::ALLOCATE_FRAMEBUFFER, 16),
            (TagId::GET_PITCH, 0),
        ]
    );
    assert_eq!(seen[1].1, [640, 480]);
    assert_eq!(seen[2].1, [640, 480]);
}

#[test]
fn test_native_size() {
    let (result, seen) = negotiate(Script {
        display: [1920, 1080],
        pitch: 3840,
        ..Script::default()
    });
    let framebuffer = result.unwrap();

    assert_eq!((framebuffer.width, framebuffer.height), (1920, 1080));
    assert_eq!(framebuffer.pitch, 3840);
    assert_eq!(seen[1].1, [1920, 1080]);
}

#[test]
fn test_display_query_failure() {
    let buffer = PropertyBuffer::new();
    let mailbox = MockFirmware::new(&buffer, ADDR, |_: &PropertyBuffer| {});
    let mut client = PropertyClient::new(mailbox, FixedAddress(ADDR), &buffer);
    let err = client
        .negotiate_framebuffer(FramebufferRequest::default())
        .unwrap_err();

    assert_eq!(
        err,
        FramebufferError::DisplaySizeQuery(PropertyError::BadResponseCode { tag: None, code: 0 })
    );
    assert_eq!(err.fatal_code(), FatalCode::DisplaySizeQuery);
}

#[test]
fn test_half_zero_display_rejected() {
    let (result, _) = negotiate(Script {
        display: [640, 0],
        ..Script::default()
    });
    assert_eq!(
        result,
        Err(FramebufferError::InvalidDisplaySize(DisplaySize {
            width: 640,
            height: 0
        }))
    );
    assert_eq!(
        fatal(Script {
            display: [0, 480],
            ..Script::default()
        }),
        FatalCode::InvalidDisplaySize
    );
}

#[test]
fn test_setup_rejected() {
    let mut seen_setup = false;
    let buffer = PropertyBuffer::new();
    let mailbox = MockFirmware::new(&buffer, ADDR, |buffer: &PropertyBuffer| {
        serve_tags(buffer, |_, value| {
            value.fill(0);
            Some(u32::try_from(value.len() * 4).unwrap())
        });
        if seen_setup {
            buffer.set(1, 0x8000_0001).unwrap();
        }
        seen_setup = true;
    });
    let mut client = PropertyClient::new(mailbox, FixedAddress(ADDR), &buffer);
    let err = client
        .negotiate_framebuffer(FramebufferRequest::default())
        .unwrap_err();

    assert!(matches!(err, FramebufferError::Setup(_)));
    assert_eq!(err.fatal_code(), FatalCode::FramebufferSetup);
}

#[test]
fn test_missing_allocate_tag() {
    let err = negotiate(Script {
        drop_allocate: true,
        ..Script::default()
    })
    .0
    .unwrap_err();
    assert!(matches!(
        err,
        FramebufferError::InvalidTagList(PropertyError::TagNotFound { .. })
    ));
    assert_eq!(err.fatal_code(), FatalCode::InvalidTagList);
}

#[test]
fn test_allocation_length() {
    for length in [None, Some(4), Some(12)] {
        assert_eq!(
            fatal(Script {
                allocation_length: length,
                ..Script::default()
            }),
            FatalCode::InvalidFramebufferResponse
        );
    }
}

#[test]
fn test_oversized_allocation_answer() {
    let err = negotiate(Script {
        allocation_length: Some(12),
        ..Script::default()
    })
    .0
    .unwrap_err();
    assert_eq!(err, FramebufferError::InvalidAllocation { length: 0x8000_000C });
}

#[test]
fn test_allocation_data() {
    for allocation in [
        [0, 0x0009_6000],
        [0x5C00_6000, 0],
        [0x2200_0000, 0x1000],
        [0xC000_0000, 0x0009_6000],
        [0x4000_0000, 0x0009_6000],
    ] {
        assert_eq!(
            fatal(Script {
                allocation,
                ..Script::default()
            }),
            FatalCode::InvalidFramebufferData
        );
    }
}

#[test]
fn test_pitch_failures() {
    assert_eq!(
        fatal(Script {
            pitch_length: None,
            ..Script::default()
        }),
        FatalCode::InvalidPitchResponse
    );
    assert_eq!(
        fatal(Script {
            pitch: 0,
            ..Script::default()
        }),
        FatalCode::InvalidPitchData
    );
}

#[test]
fn test_error_display() {
    let err = FramebufferError::InvalidAllocation { length: 0x8000_0004 };
    assert_eq!(
        format!("{err}"),
        "allocate-framebuffer answered with length 0x80000004"
    );
    assert_eq!(format!("{}", FramebufferError::InvalidPitch), "zero pitch");
}
