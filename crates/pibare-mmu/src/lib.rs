// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # pibare MMU
//!
//! Boot-time virtual memory for the ARM1176JZF-S.
//!
//! This crate provides:
//! - Bit-exact first- and second-level descriptor codecs ([`entry`])
//! - The statically allocated [`TranslationTable`] with its coarse tables
//! - [`PageTableBuilder`], which populates, activates and finalizes the table
//!   through an explicit lifecycle state machine
//! - [`AddressTranslator`], a pure software table walk
//! - [`SystemControl`], the narrow capability over the CP15 registers
//!
//! Everything except the CP15 backend is host-testable: the builder talks to
//! the hardware only through [`SystemControl`], and the mock records every
//! register write in order.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod builder;
pub mod entry;
pub mod regs;
pub mod table;
pub mod translate;

#[cfg(test)]
mod builder_test;
#[cfg(test)]
mod table_test;

pub use builder::{KernelImage, LifecycleError, PageTableBuilder};
pub use entry::{AccessClass, CoarseEntry, Descriptor, EntryKind, PageDescriptor, PageTableEntry};
pub use regs::SystemControl;
pub use table::{CoarseSlot, CoarseTable, TableState, TranslationTable};
pub use translate::{AddressTranslator, TranslationError};

#[cfg(any(test, feature = "std"))]
pub use regs::{MockSystemControl, RegisterWrite};
#[cfg(target_arch = "arm")]
pub use regs::Cp15;
