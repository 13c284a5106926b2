// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the translation table storage.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::entry::{AccessClass, CoarseEntry, PageTableEntry};
use super::table::*;
use pibare_abi::{Paddr, Vaddr};

#[test]
fn test_layout_matches_hardware_requirements() {
    assert_eq!(core::mem::align_of::<TranslationTable>(), 16 * 1024);
    assert_eq!(core::mem::align_of::<CoarseTable>(), 1024);
    assert_eq!(core::mem::size_of::<CoarseTable>(), 1024);
}

#[test]
fn test_new_table_faults_everywhere() {
    let table = Box::new(TranslationTable::new());
    assert_eq!(table.state(), TableState::Uninitialized);
    assert!(table.entries().iter().all(|entry| entry.raw() == 0));
    assert_eq!(table.coarse(CoarseSlot::KernelCode).mapped_count(), 0);
    assert_eq!(table.coarse(CoarseSlot::KernelData).mapped_count(), 0);
}

#[test]
fn test_indices() {
    assert_eq!(first_level_index(Vaddr::new(0x0000_0050)), 0);
    assert_eq!(first_level_index(Vaddr::new(0x8000_0000)), 0x800);
    assert_eq!(first_level_index(Vaddr::new(0xFFFF_FFFF)), 0xFFF);
    assert_eq!(coarse_index(Vaddr::new(0xF000_8000)), 8);
    assert_eq!(coarse_index(Vaddr::new(0xC00F_F123)), 0xFF);
}

#[test]
fn test_coarse_bases_follow_first_level() {
    let table = TranslationTable::with_entry(Paddr::new(0x0001_0000), Vaddr::new(0), PageTableEntry::FAULT);
    assert_eq!(table.coarse_base(CoarseSlot::KernelCode), Paddr::new(0x0001_4000));
    assert_eq!(table.coarse_base(CoarseSlot::KernelData), Paddr::new(0x0001_4400));
}

#[test]
fn test_coarse_at_resolves_only_owned_tables() {
    let mut table = TranslationTable::with_entry(Paddr::new(0x0001_0000), Vaddr::new(0), PageTableEntry::FAULT);
    let page = CoarseEntry::small_page(Paddr::new(0x9000), AccessClass::KernelRo, false);
    table.put_coarse(CoarseSlot::KernelData, Vaddr::new(0xC000_0000), page);

    let data = table.coarse_at(Paddr::new(0x0001_4400)).unwrap();
    assert_eq!(data.get(0), Some(page));
    assert!(table.coarse_at(Paddr::new(0x0001_4000)).is_some());

    assert!(table.coarse_at(Paddr::new(0x0001_4800)).is_none());
    assert!(table.coarse_at(Paddr::new(0x0001_4200)).is_none());
    assert!(table.coarse_at(Paddr::new(0x0001_0000)).is_none());
    assert!(table.coarse_at(Paddr::new(0x0000_3C00)).is_none());
}

#[test]
fn test_with_entry_places_descriptor() {
    let entry = PageTableEntry::section(Paddr::new(0x0030_0000), AccessClass::KernelRw, false, 0);
    let table = TranslationTable::with_entry(Paddr::new(0x4000), Vaddr::new(0x1234_5678), entry);
    assert_eq!(table.entry_for(Vaddr::new(0x1230_0000)), entry);
    assert_eq!(table.get(0x123), Some(entry));
    assert_eq!(table.get(4096), None);
}

#[test]
fn test_state_display() {
    assert_eq!(format!("{}", TableState::BootstrapActive), "bootstrap-active");
    assert!(TableState::Final.is_active());
    assert!(!TableState::Built.is_active());
}
