// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the boot table builder and its lifecycle.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::builder::*;
use super::entry::{CoarseEntry, EntryKind, PageTableEntry};
use super::regs::{MockSystemControl, RegisterWrite};
use super::table::{CoarseSlot, TableState, TranslationTable};
use pibare_abi::{Paddr, Vaddr};

const TABLE_BASE: Paddr = Paddr::new(0x0002_0000);

/// A typical image: code from 0x8000, data from 0x1C000, tables at the end.
const IMAGE: KernelImage = KernelImage {
    load_start: Paddr::new(0x8000),
    data_start: Paddr::new(0x0001_C000),
    init_end: Paddr::new(0x0001_D800),
    image_end: Paddr::new(0x0002_8000),
};

fn built_table() -> Box<TranslationTable> {
    let mut table = Box::new(TranslationTable::new());
    PageTableBuilder::new(&mut table)
        .build_bootstrap_tables(TABLE_BASE, &IMAGE)
        .unwrap();
    table
}

// =============================================================================
// build_bootstrap_tables
// =============================================================================

#[test]
fn test_build_moves_to_built() {
    let table = built_table();
    assert_eq!(table.state(), TableState::Built);
    assert_eq!(table.base(), TABLE_BASE);
}

#[test]
fn test_physical_window_sections() {
    let table = built_table();
    for index in 0x800..0xA10_u32 {
        let entry = table.get(index as usize).unwrap();
        assert_eq!(entry.raw(), ((index - 0x800) << 20) | 0x412, "entry {index:#x}");
    }
    assert_eq!(table.get(0x7FF).unwrap(), PageTableEntry::FAULT);
    assert_eq!(table.get(0xA10).unwrap(), PageTableEntry::FAULT);
}

#[test]
fn test_identity_window_section() {
    let table = built_table();
    assert_eq!(table.get(0).unwrap().raw(), 0x0000_0402);
    assert_eq!(table.get(1).unwrap(), PageTableEntry::FAULT);
}

#[test]
fn test_kernel_windows_point_at_coarse_tables() {
    let table = built_table();
    assert_eq!(table.get(0xF00).unwrap().raw(), 0x0002_4001);
    assert_eq!(table.get(0xC00).unwrap().raw(), 0x0002_4401);
    assert_eq!(table.get(0xF00).unwrap().kind(), EntryKind::Coarse);
}

#[test]
fn test_everything_else_faults() {
    let table = built_table();
    let mapped = table.entries().iter().filter(|entry| entry.raw() != 0).count();
    // 528 window sections, identity, two coarse pointers
    assert_eq!(mapped, 0x210 + 1 + 2);
}

#[test]
fn test_code_window_maps_image_through_initialized_data() {
    let table = built_table();
    let code = table.coarse(CoarseSlot::KernelCode);

    assert_eq!(code.get(7), Some(CoarseEntry::FAULT));
    assert_eq!(code.get(8).unwrap().raw(), 0x0000_8212);
    assert_eq!(code.get(0x1D).unwrap().raw(), 0x0001_D212);
    assert_eq!(code.get(0x1E), Some(CoarseEntry::FAULT));
    assert_eq!(code.mapped_count(), 0x1E - 8);
}

#[test]
fn test_data_window_maps_data_and_bss() {
    let table = built_table();
    let data = table.coarse(CoarseSlot::KernelData);

    assert_eq!(data.get(0).unwrap().raw(), 0x0001_C013);
    assert_eq!(data.get(11).unwrap().raw(), 0x0002_7013);
    assert_eq!(data.get(12), Some(CoarseEntry::FAULT));
    assert_eq!(data.mapped_count(), 12);
}

#[test]
fn test_rebuild_starts_from_scratch() {
    let mut table = built_table();
    let small = KernelImage {
        image_end: Paddr::new(0x0001_E000),
        ..IMAGE
    };
    PageTableBuilder::new(&mut table)
        .build_bootstrap_tables(TABLE_BASE, &small)
        .unwrap();
    assert_eq!(table.coarse(CoarseSlot::KernelData).mapped_count(), 2);
}

#[test]
fn test_misaligned_base_rejected() {
    let mut table = Box::new(TranslationTable::new());
    let result = PageTableBuilder::new(&mut table).build_bootstrap_tables(Paddr::new(0x0002_1000), &IMAGE);
    assert_eq!(
        result,
        Err(LifecycleError::MisalignedTable {
            base: Paddr::new(0x0002_1000)
        })
    );
    assert_eq!(table.state(), TableState::Uninitialized);
}

#[test]
fn test_oversized_image_rejected() {
    let mut table = Box::new(TranslationTable::new());
    let mut builder = PageTableBuilder::new(&mut table);

    let huge_code = KernelImage {
        init_end: Paddr::new(0x0010_0001),
        image_end: Paddr::new(0x0010_1000),
        ..IMAGE
    };
    assert_eq!(
        builder.build_bootstrap_tables(TABLE_BASE, &huge_code),
        Err(LifecycleError::ImageTooLarge)
    );

    let huge_data = KernelImage {
        image_end: Paddr::new(0x0011_D000),
        ..IMAGE
    };
    assert_eq!(
        builder.build_bootstrap_tables(TABLE_BASE, &huge_data),
        Err(LifecycleError::ImageTooLarge)
    );
}

#[test]
fn test_inconsistent_image_rejected() {
    let mut table = Box::new(TranslationTable::new());
    let mut builder = PageTableBuilder::new(&mut table);

    let reversed = KernelImage {
        init_end: Paddr::new(0x0001_0000),
        ..IMAGE
    };
    assert_eq!(
        builder.build_bootstrap_tables(TABLE_BASE, &reversed),
        Err(LifecycleError::InvalidImage)
    );

    let unaligned = KernelImage {
        data_start: Paddr::new(0x0001_C100),
        ..IMAGE
    };
    assert_eq!(
        builder.build_bootstrap_tables(TABLE_BASE, &unaligned),
        Err(LifecycleError::InvalidImage)
    );
}

// =============================================================================
// activate
// =============================================================================

#[test]
fn test_activate_requires_built_table() {
    let mut table = Box::new(TranslationTable::new());
    let mut regs = MockSystemControl::new();
    assert_eq!(
        PageTableBuilder::new(&mut table).activate(&mut regs),
        Err(LifecycleError::NotBuilt)
    );
    assert!(regs.writes().is_empty());
}

#[test]
fn test_activate_register_sequence() {
    let mut table = built_table();
    let mut regs = MockSystemControl::new();
    PageTableBuilder::new(&mut table).activate(&mut regs).unwrap();

    assert_eq!(
        regs.writes(),
        &[
            RegisterWrite::Ttbr0(TABLE_BASE),
            RegisterWrite::Ttbr1(TABLE_BASE),
            RegisterWrite::Ttbcr(0),
            RegisterWrite::Dacr(0x1),
            RegisterWrite::Sctlr(MockSystemControl::SCTLR_RESET | 1 | (1 << 23)),
        ]
    );
    assert!(regs.mmu_enabled());
    assert_eq!(table.state(), TableState::BootstrapActive);
}

#[test]
fn test_active_table_is_frozen() {
    let mut table = built_table();
    let mut regs = MockSystemControl::new();
    let mut builder = PageTableBuilder::new(&mut table);
    builder.activate(&mut regs).unwrap();

    assert_eq!(builder.activate(&mut regs), Err(LifecycleError::AlreadyActive));
    assert_eq!(
        builder.build_bootstrap_tables(TABLE_BASE, &IMAGE),
        Err(LifecycleError::AlreadyActive)
    );
    assert_eq!(regs.writes().len(), 5);
}

// =============================================================================
// finalize_unmap
// =============================================================================

#[test]
fn test_finalize_requires_active_table() {
    let mut table = built_table();
    let mut regs = MockSystemControl::new();
    assert_eq!(
        PageTableBuilder::new(&mut table).finalize_unmap(&mut regs),
        Err(LifecycleError::NotActive)
    );
    assert_eq!(table.get(0).unwrap().raw(), 0x0000_0402);
}

#[test]
fn test_finalize_clears_identity_and_invalidates() {
    let mut table = built_table();
    let mut regs = MockSystemControl::new();
    let mut builder = PageTableBuilder::new(&mut table);
    builder.activate(&mut regs).unwrap();
    builder.finalize_unmap(&mut regs).unwrap();

    assert_eq!(builder.state(), TableState::Final);
    assert_eq!(builder.table().get(0), Some(PageTableEntry::FAULT));
    assert_eq!(
        regs.writes().last(),
        Some(&RegisterWrite::InvalidateTlbEntry(Vaddr::new(0)))
    );
    // Only entry 0 changes.
    assert_eq!(builder.table().get(0x800).unwrap().raw(), 0x0000_0412);
    assert_eq!(builder.table().get(0xF00).unwrap().raw(), 0x0002_4001);
}

#[test]
fn test_finalize_twice_rejected() {
    let mut table = built_table();
    let mut regs = MockSystemControl::new();
    let mut builder = PageTableBuilder::new(&mut table);
    builder.activate(&mut regs).unwrap();
    builder.finalize_unmap(&mut regs).unwrap();

    assert_eq!(builder.finalize_unmap(&mut regs), Err(LifecycleError::AlreadyFinal));
    assert_eq!(builder.activate(&mut regs), Err(LifecycleError::AlreadyActive));
    assert_eq!(regs.writes().len(), 6);
}

#[test]
fn test_builder_recreated_after_jump() {
    let mut table = built_table();
    let mut regs = MockSystemControl::new();
    PageTableBuilder::new(&mut table).activate(&mut regs).unwrap();

    // State lives in the table, not in the builder.
    let mut builder = PageTableBuilder::new(&mut table);
    assert_eq!(builder.state(), TableState::BootstrapActive);
    builder.finalize_unmap(&mut regs).unwrap();
}

#[test]
fn test_translator_only_after_finalize() {
    let mut table = built_table();
    let mut regs = MockSystemControl::new();
    {
        let mut builder = PageTableBuilder::new(&mut table);
        builder.activate(&mut regs).unwrap();
    }
    assert_eq!(
        PageTableBuilder::new(&mut table).into_translator().err(),
        Some(LifecycleError::NotActive)
    );

    let mut builder = PageTableBuilder::new(&mut table);
    builder.finalize_unmap(&mut regs).unwrap();
    let translator = builder.into_translator().unwrap();
    assert_eq!(translator.table().state(), TableState::Final);
}

#[test]
fn test_error_display() {
    assert_eq!(
        format!("{}", LifecycleError::MisalignedTable { base: Paddr::new(0x4100) }),
        "translation table at 0x00004100 not 16 KiB aligned"
    );
    assert_eq!(format!("{}", LifecycleError::NotBuilt), "translation table not built");
}

#[test]
fn test_kernel_code_vaddr() {
    assert_eq!(kernel_code_vaddr(Paddr::new(0x8000)), Vaddr::new(0xF000_8000));
}
