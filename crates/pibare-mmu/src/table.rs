// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Statically allocated translation table storage.
//!
//! A [`TranslationTable`] is one contiguous block: the 16 KiB first-level
//! array followed by the coarse tables the boot mappings need. Keeping them
//! together means a single physical base address (the value written to TTBR0)
//! determines the physical address of every coarse table, so the table walker
//! in [`crate::translate`] can resolve coarse pointers without any side
//! channel.
//!
//! ```text
//! base + 0x0000  first-level entries [4096]   (16 KiB, 16 KiB aligned)
//! base + 0x4000  coarse table 0 [256]         (1 KiB)  kernel code window
//! base + 0x4400  coarse table 1 [256]         (1 KiB)  kernel data window
//! ```

use core::fmt;

use pibare_abi::{Paddr, Vaddr};

use crate::entry::{CoarseEntry, PageTableEntry};

/// Number of first-level entries (one per MiB).
pub const FIRST_LEVEL_ENTRIES: usize = 4096;

/// Number of entries in a coarse table (one per 4 KiB).
pub const COARSE_ENTRIES: usize = 256;

/// Number of coarse tables carried by a [`TranslationTable`].
pub const COARSE_TABLES: usize = 2;

/// Alignment the hardware requires for the first-level table.
pub const TABLE_ALIGN: u32 = 16 * 1024;

/// Alignment the hardware requires for a coarse table.
pub const COARSE_ALIGN: u32 = 1024;

/// Byte offset of the first coarse table from the table base.
const COARSE_OFFSET: u32 = (FIRST_LEVEL_ENTRIES * 4) as u32;

/// Byte size of one coarse table.
const COARSE_SIZE: u32 = (COARSE_ENTRIES * 4) as u32;

/// Index of a coarse table within [`TranslationTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoarseSlot {
    /// Maps the kernel code window at `0xF000_0000`.
    KernelCode = 0,
    /// Maps the kernel data window at `0xC000_0000`.
    KernelData = 1,
}

impl CoarseSlot {
    const fn index(self) -> usize {
        self as usize
    }
}

/// Lifecycle of a translation table.
///
/// ```text
/// Uninitialized --build--> Built --activate--> BootstrapActive --finalize--> Final
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TableState {
    /// Storage exists, nothing is mapped.
    #[default]
    Uninitialized,
    /// Boot mappings are written; the MMU does not use the table yet.
    Built,
    /// The MMU walks this table; the identity window is still mapped.
    BootstrapActive,
    /// Identity window retired; the table is read-only from now on.
    Final,
}

impl TableState {
    /// Checks whether the MMU is walking the table.
    #[inline]
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::BootstrapActive | Self::Final)
    }
}

impl fmt::Display for TableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Built => "built",
            Self::BootstrapActive => "bootstrap-active",
            Self::Final => "final",
        };
        f.write_str(name)
    }
}

/// A second-level table covering one MiB in 4 KiB steps.
#[derive(Clone)]
#[repr(C, align(1024))]
pub struct CoarseTable {
    entries: [CoarseEntry; COARSE_ENTRIES],
}

impl CoarseTable {
    /// Creates a table with every entry faulting.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [CoarseEntry::FAULT; COARSE_ENTRIES],
        }
    }

    /// Entry covering `vaddr` (bits `[19:12]`).
    #[inline]
    #[must_use]
    pub const fn entry_for(&self, vaddr: Vaddr) -> CoarseEntry {
        self.entries[coarse_index(vaddr)]
    }

    /// Entry at `index`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<CoarseEntry> {
        self.entries.get(index).copied()
    }

    /// Number of entries that do not fault.
    #[must_use]
    pub fn mapped_count(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.is_fault()).count()
    }

    pub(crate) fn set(&mut self, index: usize, entry: CoarseEntry) {
        self.entries[index] = entry;
    }

    fn clear(&mut self) {
        self.entries = [CoarseEntry::FAULT; COARSE_ENTRIES];
    }
}

impl Default for CoarseTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The boot translation table: first level plus its coarse tables.
///
/// Must live at a 16 KiB aligned physical address; the Rust alignment of the
/// type enforces this for statics placed in physically contiguous memory.
#[repr(C, align(16384))]
pub struct TranslationTable {
    entries: [PageTableEntry; FIRST_LEVEL_ENTRIES],
    coarse: [CoarseTable; COARSE_TABLES],
    base: Paddr,
    state: TableState,
}

// The hardware walker reads the first two fields by physical address.
const _: () = {
    assert!(core::mem::offset_of!(TranslationTable, entries) == 0);
    assert!(core::mem::offset_of!(TranslationTable, coarse) == COARSE_OFFSET as usize);
    assert!(core::mem::size_of::<CoarseTable>() == COARSE_SIZE as usize);
    assert!(COARSE_OFFSET % COARSE_ALIGN == 0);
};

impl TranslationTable {
    /// Creates an empty, uninitialized table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [PageTableEntry::FAULT; FIRST_LEVEL_ENTRIES],
            coarse: [CoarseTable::new(), CoarseTable::new()],
            base: Paddr::null(),
            state: TableState::Uninitialized,
        }
    }

    /// Physical address of the first-level array (the TTBR value).
    #[inline]
    #[must_use]
    pub const fn base(&self) -> Paddr {
        self.base
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> TableState {
        self.state
    }

    /// First-level entry covering `vaddr` (bits `[31:20]`).
    #[inline]
    #[must_use]
    pub const fn entry_for(&self, vaddr: Vaddr) -> PageTableEntry {
        self.entries[first_level_index(vaddr)]
    }

    /// First-level entry at `index`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<PageTableEntry> {
        self.entries.get(index).copied()
    }

    /// All first-level entries in index order.
    #[must_use]
    pub const fn entries(&self) -> &[PageTableEntry; FIRST_LEVEL_ENTRIES] {
        &self.entries
    }

    /// Physical address of a coarse table.
    #[must_use]
    pub const fn coarse_base(&self, slot: CoarseSlot) -> Paddr {
        self.base
            .add(COARSE_OFFSET)
            .add(COARSE_SIZE * slot as u32)
    }

    /// Coarse table in `slot`.
    #[must_use]
    pub const fn coarse(&self, slot: CoarseSlot) -> &CoarseTable {
        &self.coarse[slot.index()]
    }

    /// Resolves a coarse pointer to the table it designates.
    ///
    /// Returns `None` for addresses that are not one of this table's coarse
    /// tables.
    #[must_use]
    pub fn coarse_at(&self, table: Paddr) -> Option<&CoarseTable> {
        let offset = table.diff(self.base).checked_sub(COARSE_OFFSET)?;
        if offset % COARSE_SIZE != 0 {
            return None;
        }
        self.coarse.get((offset / COARSE_SIZE) as usize)
    }

    // -------------------------------------------------------------------------
    // Mutation, reserved to the builder
    // -------------------------------------------------------------------------

    /// Resets every entry to fault and records the physical base.
    pub(crate) fn reset(&mut self, base: Paddr) {
        self.entries = [PageTableEntry::FAULT; FIRST_LEVEL_ENTRIES];
        for table in &mut self.coarse {
            table.clear();
        }
        self.base = base;
        self.state = TableState::Uninitialized;
    }

    pub(crate) fn set_entry(&mut self, vaddr: Vaddr, entry: PageTableEntry) {
        self.entries[first_level_index(vaddr)] = entry;
    }

    pub(crate) fn coarse_mut(&mut self, slot: CoarseSlot) -> &mut CoarseTable {
        &mut self.coarse[slot.index()]
    }

    pub(crate) fn set_state(&mut self, state: TableState) {
        self.state = state;
    }

    /// Builds a table with one raw first-level entry, for exercising the
    /// table walker against hand-crafted descriptors.
    #[cfg(any(test, feature = "std"))]
    #[must_use]
    pub fn with_entry(base: Paddr, vaddr: Vaddr, entry: PageTableEntry) -> std::boxed::Box<Self> {
        let mut table = std::boxed::Box::new(Self::new());
        table.reset(base);
        table.set_entry(vaddr, entry);
        table
    }

    /// Writes one raw first-level entry, for host tests that need a mapping
    /// the boot layout lacks. Ignores the lifecycle state.
    #[cfg(any(test, feature = "std"))]
    pub fn put_entry(&mut self, vaddr: Vaddr, entry: PageTableEntry) {
        self.set_entry(vaddr, entry);
    }

    /// Writes one raw coarse entry, for the same purpose as
    /// [`Self::with_entry`].
    #[cfg(any(test, feature = "std"))]
    pub fn put_coarse(&mut self, slot: CoarseSlot, vaddr: Vaddr, entry: CoarseEntry) {
        self.coarse_mut(slot).set(coarse_index(vaddr), entry);
    }
}

impl Default for TranslationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TranslationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mapped = self.entries.iter().filter(|entry| entry.raw() != 0).count();
        f.debug_struct("TranslationTable")
            .field("base", &self.base)
            .field("state", &self.state)
            .field("mapped", &mapped)
            .finish_non_exhaustive()
    }
}

/// First-level index of a virtual address.
#[inline]
#[must_use]
pub const fn first_level_index(vaddr: Vaddr) -> usize {
    (vaddr.as_u32() >> 20) as usize
}

/// Coarse-table index of a virtual address.
#[inline]
#[must_use]
pub const fn coarse_index(vaddr: Vaddr) -> usize {
    ((vaddr.as_u32() >> 12) & 0xFF) as usize
}
