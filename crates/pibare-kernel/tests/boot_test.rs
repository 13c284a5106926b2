// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! End-to-end boot on the host.
//!
//! Runs `early_init` and `kernel_main` against the simulated CP15 register
//! file and a scripted VideoCore, then checks the address space and the
//! boot report the kernel ends up with.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, missing_docs)]

use pibare_abi::{BootArgs, FatalCode, Paddr, TagId, Vaddr};
use pibare_kernel::{early_init, kernel_main};
use pibare_mailbox::{MockFirmware, PropertyBuffer, serve_tags};
use pibare_mmu::{
    AccessClass, AddressTranslator, KernelImage, MockSystemControl, PageTableEntry,
    RegisterWrite, TableState, TranslationError, TranslationTable,
};

const TABLE_BASE: Paddr = Paddr::new(0x0002_0000);

const IMAGE: KernelImage = KernelImage {
    load_start: Paddr::new(0x8000),
    data_start: Paddr::new(0x1C000),
    init_end: Paddr::new(0x1D800),
    image_end: Paddr::new(0x28000),
};

const COMMAND_LINE: &[u8] = b"bcm2708_fb.fbwidth=640 console=ttyAMA0,115200\0";

/// How the scripted firmware deviates from a healthy one.
#[derive(Clone, Copy, Default)]
struct Faults {
    no_pitch: bool,
    no_memory: bool,
}

fn firmware(faults: Faults) -> impl FnMut(&PropertyBuffer) {
    move |buffer: &PropertyBuffer| {
        serve_tags(buffer, |id, value| match id {
            TagId::GET_PHYSICAL_DISPLAY_SIZE => Some(8),
            TagId::SET_PHYSICAL_SIZE | TagId::SET_VIRTUAL_SIZE => Some(8),
            TagId::SET_DEPTH => Some(4),
            TagId::ALLOCATE_FRAMEBUFFER => {
                value.copy_from_slice(&[0x5C00_6000, 0x0009_6000]);
                Some(8)
            }
            TagId::GET_PITCH if !faults.no_pitch => {
                value[0] = 1280;
                Some(4)
            }
            TagId::GET_ARM_MEMORY if !faults.no_memory => {
                value.copy_from_slice(&[0, 0x1C00_0000]);
                Some(8)
            }
            TagId::GET_VC_MEMORY if !faults.no_memory => {
                value.copy_from_slice(&[0x1C00_0000, 0x0400_0000]);
                Some(8)
            }
            TagId::GET_COMMAND_LINE => {
                for (word, chunk) in value.iter_mut().zip(COMMAND_LINE.chunks(4)) {
                    let mut bytes = [0_u8; 4];
                    bytes[..chunk.len()].copy_from_slice(chunk);
                    *word = u32::from_le_bytes(bytes);
                }
                Some(u32::try_from(COMMAND_LINE.len()).unwrap())
            }
            _ => None,
        });
    }
}

/// Physical address the booted kernel will use for `buffer`, or `None` if
/// the buffer cannot be reached once the identity window is gone.
///
/// The buffer sits wherever the host allocator put it. A MiB the boot
/// layout leaves unmapped gets a section, as a kernel data mapping would.
fn map_buffer(table: &mut TranslationTable, buffer: &PropertyBuffer) -> Option<Paddr> {
    let vaddr = Vaddr::from_ptr(buffer.as_ptr());
    if vaddr.as_u32() >> 20 == 0 {
        return None;
    }
    if table.entry_for(vaddr) == PageTableEntry::FAULT {
        let section = PageTableEntry::section(Paddr::new(0x0030_0000), AccessClass::KernelRw, true, 0);
        table.put_entry(vaddr, section);
    }
    AddressTranslator::new(table).translate(vaddr).ok()
}

struct Booted {
    table: Box<TranslationTable>,
    regs: MockSystemControl,
    expected: Option<Paddr>,
    sent: Vec<(u8, Paddr)>,
    result: Result<pibare_kernel::BootReport, FatalCode>,
}

fn boot(args: BootArgs, faults: Faults) -> Booted {
    let mut table = Box::new(TranslationTable::new());
    let mut regs = MockSystemControl::new();
    let buffer = Box::new(PropertyBuffer::new());

    early_init(&mut table, TABLE_BASE, &IMAGE, &mut regs).unwrap();
    let expected = map_buffer(&mut table, &buffer);

    let mut mailbox = MockFirmware::new(&buffer, expected.unwrap_or(Paddr::null()), firmware(faults));
    let result = kernel_main(&mut table, &mut regs, &mut mailbox, &buffer, args);
    let sent = mailbox.sent().to_vec();
    Booted {
        table,
        regs,
        expected,
        sent,
        result,
    }
}

fn pi_args() -> BootArgs {
    BootArgs::from_registers(0, 0x0c42, 0x100)
}

#[test]
fn boot_reaches_final_address_space() {
    let booted = boot(pi_args(), Faults::default());

    assert_eq!(booted.table.state(), TableState::Final);
    assert_eq!(
        booted.regs.writes().last(),
        Some(&RegisterWrite::InvalidateTlbEntry(Vaddr::new(0)))
    );

    let translator = AddressTranslator::new(&booted.table);
    assert_eq!(
        translator.translate(Vaddr::new(0x0000_0050)),
        Err(TranslationError::Fault {
            vaddr: Vaddr::new(0x0000_0050)
        })
    );
    assert_eq!(
        translator.translate(Vaddr::new(0x8000_0050)),
        Ok(Paddr::new(0x0000_0050))
    );
    assert_eq!(
        translator.translate(Vaddr::new(0xA020_1000)),
        Ok(Paddr::new(0x2020_1000))
    );
}

#[test]
fn boot_negotiates_display_and_reports_system() {
    let booted = boot(pi_args(), Faults::default());
    let Some(address) = booted.expected else {
        assert_eq!(booted.result.err(), Some(FatalCode::MailboxBufferUnmapped));
        return;
    };

    let report = booted.result.unwrap();
    assert!(booted.sent.iter().all(|&post| post == (8, address)));
    // display size, setup, pitch, memory, command line
    assert_eq!(booted.sent.len(), 5);

    let fb = report.framebuffer;
    assert_eq!((fb.width, fb.height, fb.depth, fb.pitch), (640, 480, 16, 1280));
    assert_eq!(fb.base, Paddr::new(0x1C00_6000));
    assert_eq!(fb.virt, Vaddr::new(0x9C00_6000));

    let memory = report.memory.unwrap();
    assert_eq!(memory.arm.megabytes(), 448);
    assert_eq!(memory.videocore.base, Paddr::new(0x1C00_0000));

    assert_eq!(
        report.command_line.as_str(),
        "bcm2708_fb.fbwidth=640 console=ttyAMA0,115200"
    );
    assert_eq!(report.args, pi_args());
}

#[test]
fn missing_pitch_is_fatal() {
    let booted = boot(
        pi_args(),
        Faults {
            no_pitch: true,
            ..Faults::default()
        },
    );
    let expected = if booted.expected.is_some() {
        FatalCode::InvalidPitchResponse
    } else {
        FatalCode::MailboxBufferUnmapped
    };
    assert_eq!(booted.result.err(), Some(expected));
    assert_eq!(booted.table.state(), TableState::Final);
}

#[test]
fn missing_memory_report_is_not_fatal() {
    let booted = boot(
        pi_args(),
        Faults {
            no_memory: true,
            ..Faults::default()
        },
    );
    if booted.expected.is_none() {
        return;
    }
    let report = booted.result.unwrap();
    assert!(report.memory.is_none());
    assert!(!report.command_line.is_empty());
}

#[test]
fn unknown_board_still_boots() {
    let args = BootArgs::from_registers(0, 0x0183, 0x100);
    let booted = boot(args, Faults::default());
    if booted.expected.is_none() {
        return;
    }
    assert!(!booted.result.unwrap().args.is_expected_board());
}
