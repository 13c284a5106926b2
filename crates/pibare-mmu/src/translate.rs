// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Software table walk.
//!
//! Mirrors what the ARM1176 table walker does for a data access, minus the
//! permission checks: the result is the physical address backing a virtual
//! address, which is what the VideoCore needs when it is handed a buffer.

use core::fmt;

use pibare_abi::{Paddr, Vaddr, layout};

use crate::entry::{EntryKind, KIND_MASK};
use crate::table::TranslationTable;

/// Why a virtual address has no physical backing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationError {
    /// No mapping for the address.
    Fault {
        /// Address that was looked up.
        vaddr: Vaddr,
    },
    /// A descriptor with reserved kind bits, or a coarse pointer that does
    /// not designate one of the table's coarse tables.
    Malformed {
        /// Address that was looked up.
        vaddr: Vaddr,
        /// The offending descriptor word.
        descriptor: u32,
    },
}

impl TranslationError {
    /// Checks whether the error means "not mapped".
    ///
    /// Always true: a malformed descriptor faults on hardware exactly like
    /// an empty one.
    #[inline]
    #[must_use]
    pub const fn is_fault(self) -> bool {
        matches!(self, Self::Fault { .. } | Self::Malformed { .. })
    }

    /// Address that failed to translate.
    #[inline]
    #[must_use]
    pub const fn vaddr(self) -> Vaddr {
        match self {
            Self::Fault { vaddr } | Self::Malformed { vaddr, .. } => vaddr,
        }
    }
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fault { vaddr } => write!(f, "translation fault at {vaddr}"),
            Self::Malformed { vaddr, descriptor } => {
                write!(f, "malformed descriptor {descriptor:#010x} for {vaddr}")
            }
        }
    }
}

/// Walks a translation table.
///
/// Holds a shared borrow, so the table cannot change while a translator
/// exists.
#[derive(Debug, Clone, Copy)]
pub struct AddressTranslator<'t> {
    table: &'t TranslationTable,
}

impl<'t> AddressTranslator<'t> {
    /// Creates a translator over `table`.
    #[must_use]
    pub const fn new(table: &'t TranslationTable) -> Self {
        Self { table }
    }

    /// Physical address backing `vaddr`.
    ///
    /// # Errors
    ///
    /// [`TranslationError::Fault`] for unmapped addresses,
    /// [`TranslationError::Malformed`] for reserved encodings.
    pub fn translate(&self, vaddr: Vaddr) -> Result<Paddr, TranslationError> {
        let v = vaddr.as_u32();
        let entry = self.table.entry_for(vaddr);
        let raw = entry.raw();

        match entry.kind() {
            EntryKind::Fault => Err(TranslationError::Fault { vaddr }),
            EntryKind::Reserved => Err(TranslationError::Malformed {
                vaddr,
                descriptor: raw,
            }),
            EntryKind::Section if entry.is_supersection() => {
                Ok(Paddr::new((raw & !0x00FF_FFFF) + (v & 0x00FF_FFFF)))
            }
            EntryKind::Section => Ok(Paddr::new((raw & !0x000F_FFFF) + (v & 0x000F_FFFF))),
            EntryKind::Coarse => {
                let coarse = self
                    .table
                    .coarse_at(Paddr::new(raw & !0x3FF))
                    .ok_or(TranslationError::Malformed {
                        vaddr,
                        descriptor: raw,
                    })?;
                let page = coarse.entry_for(vaddr).raw();
                match page & KIND_MASK {
                    0b00 => Err(TranslationError::Fault { vaddr }),
                    0b01 => Ok(Paddr::new((page & !0xFFFF) + (v & 0xFFFF))),
                    _ => Ok(Paddr::new((page & !0xFFF) + (v & 0xFFF))),
                }
            }
        }
    }

    /// Physical address backing a pointer.
    ///
    /// # Errors
    ///
    /// As for [`Self::translate`].
    pub fn translate_ptr<T>(&self, ptr: *const T) -> Result<Paddr, TranslationError> {
        self.translate(Vaddr::from_ptr(ptr))
    }

    /// Virtual address of `paddr` inside the physical window.
    ///
    /// A linear offset, not a reverse walk. `None` outside the window.
    #[must_use]
    pub const fn physical_to_virtual(&self, paddr: Paddr) -> Option<Vaddr> {
        layout::physical_to_virtual(paddr)
    }

    /// The table being walked.
    #[must_use]
    pub const fn table(&self) -> &'t TranslationTable {
        self.table
    }
}
