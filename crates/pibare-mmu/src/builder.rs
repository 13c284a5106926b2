// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Boot translation table construction and the MMU handoff.
//!
//! The builder drives a [`TranslationTable`] through its lifecycle:
//!
//! 1. [`PageTableBuilder::build_bootstrap_tables`] writes the boot mappings
//!    while the MMU is still off.
//! 2. [`PageTableBuilder::activate`] installs the table and turns the MMU on.
//!    Execution continues in the identity window at address 0.
//! 3. Boot code jumps into the kernel code window.
//! 4. [`PageTableBuilder::finalize_unmap`] retires the identity window. This is
//!    the only mutation allowed after activation.
//!
//! Steps 1 and 2 run before any virtual address is valid: they must not log,
//! and must not touch any memory except through the table reference.
//!
//! # Boot mappings
//!
//! | Virtual | Physical | Kind | Access |
//! |---------|----------|------|--------|
//! | `0x0000_0000` (1 MiB) | `0x0000_0000` | section | kernel-rw |
//! | `0x8000_0000..0xA100_0000` | `0x0000_0000..` | sections | kernel-rw, XN |
//! | `0xC000_0000` (1 MiB) | kernel data frames | coarse, small pages | kernel-rw, XN |
//! | `0xF000_0000` (1 MiB) | kernel image frames | coarse, small pages | kernel-ro |
//!
//! Everything else faults.

use core::fmt;

use pibare_abi::layout::{
    IDENTITY_BASE, KERNEL_CODE_BASE, KERNEL_DATA_BASE, PAGE_SIZE, PHYS_WINDOW_BASE,
    PHYS_WINDOW_END, PHYS_WINDOW_TARGET, SECTION_SIZE,
};
use pibare_abi::{Paddr, Vaddr};

use crate::entry::{AccessClass, CoarseEntry, PageTableEntry};
use crate::regs::{
    DACR_DOMAIN0_CLIENT, SCTLR_EXTENDED_PAGE_TABLES, SCTLR_MMU_ENABLE, SystemControl,
    TTBCR_NO_SPLIT,
};
use crate::table::{COARSE_ENTRIES, CoarseSlot, TABLE_ALIGN, TableState, TranslationTable};
use crate::translate::AddressTranslator;

/// Domain every boot mapping belongs to.
pub const KERNEL_DOMAIN: u8 = 0;

/// Physical extent of the loaded kernel image.
///
/// All addresses are physical and come from the linker script.
///
/// ```text
/// load_start        data_start        init_end          image_end
///     | code, rodata    | .data             | .bss, tables    |
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct KernelImage {
    /// Where the loader placed the first byte of the image.
    pub load_start: Paddr,
    /// Start of the writable data segment (page aligned).
    pub data_start: Paddr,
    /// End of initialized data (`.data`), exclusive.
    pub init_end: Paddr,
    /// End of everything the kernel owns, including `.bss` and the
    /// translation table storage, exclusive.
    pub image_end: Paddr,
}

impl KernelImage {
    /// Frames the code window maps: the frame holding `load_start` up to the
    /// frame holding the last byte of initialized data.
    fn code_frames(&self) -> core::ops::Range<u32> {
        let first = self.load_start.as_u32() / PAGE_SIZE;
        let last = self.init_end.as_u32().div_ceil(PAGE_SIZE);
        first..last
    }

    /// Number of frames the data window maps from `data_start`.
    fn data_frames(&self) -> u32 {
        self.image_end.diff(self.data_start).div_ceil(PAGE_SIZE)
    }

    fn validate(&self) -> Result<(), LifecycleError> {
        let ordered = self.load_start <= self.data_start
            && self.data_start <= self.init_end
            && self.init_end <= self.image_end;
        if !ordered || !self.data_start.is_aligned(PAGE_SIZE) {
            return Err(LifecycleError::InvalidImage);
        }
        let code_fits = self.code_frames().end as usize <= COARSE_ENTRIES;
        let data_fits = self.data_frames() as usize <= COARSE_ENTRIES;
        if !code_fits || !data_fits {
            return Err(LifecycleError::ImageTooLarge);
        }
        Ok(())
    }
}

/// Rejected lifecycle transition or unusable input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    /// Activation requested before the boot mappings were built.
    NotBuilt,
    /// The table is already walked by the MMU; it can no longer be rebuilt
    /// or re-activated.
    AlreadyActive,
    /// The identity window can only be retired from the bootstrap state.
    NotActive,
    /// The identity window was already retired.
    AlreadyFinal,
    /// Kernel code or data does not fit into a single coarse table.
    ImageTooLarge,
    /// Kernel image bounds are out of order or misaligned.
    InvalidImage,
    /// The table's physical base is not 16 KiB aligned.
    MisalignedTable {
        /// Offending physical base.
        base: Paddr,
    },
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotBuilt => write!(f, "translation table not built"),
            Self::AlreadyActive => write!(f, "translation table already active"),
            Self::NotActive => write!(f, "translation table not active"),
            Self::AlreadyFinal => write!(f, "identity window already retired"),
            Self::ImageTooLarge => write!(f, "kernel image exceeds one coarse table"),
            Self::InvalidImage => write!(f, "kernel image bounds inconsistent"),
            Self::MisalignedTable { base } => {
                write!(f, "translation table at {base} not 16 KiB aligned")
            }
        }
    }
}

/// Populates, activates and finalizes the boot translation table.
///
/// The lifecycle state lives in the table, so a builder can be recreated
/// around the same table after the jump into high memory.
pub struct PageTableBuilder<'t> {
    table: &'t mut TranslationTable,
}

impl<'t> PageTableBuilder<'t> {
    /// Wraps a table.
    pub const fn new(table: &'t mut TranslationTable) -> Self {
        Self { table }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TableState {
        self.table.state()
    }

    /// Read access to the table being built.
    #[must_use]
    pub const fn table(&self) -> &TranslationTable {
        self.table
    }

    /// Writes the boot mappings.
    ///
    /// `base` is the physical address the table itself lives at; it becomes
    /// the TTBR value and determines the coarse tables' addresses. Every
    /// first-level entry is written: a rebuild from [`TableState::Built`]
    /// starts from scratch.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::AlreadyActive`] once the MMU walks the table
    /// - [`LifecycleError::MisalignedTable`] if `base` is not 16 KiB aligned
    /// - [`LifecycleError::InvalidImage`] / [`LifecycleError::ImageTooLarge`]
    ///   for unusable image bounds
    pub fn build_bootstrap_tables(
        &mut self,
        base: Paddr,
        image: &KernelImage,
    ) -> Result<(), LifecycleError> {
        if self.state().is_active() {
            return Err(LifecycleError::AlreadyActive);
        }
        if !base.is_aligned(TABLE_ALIGN) {
            return Err(LifecycleError::MisalignedTable { base });
        }
        image.validate()?;

        self.table.reset(base);
        self.map_physical_window();
        self.map_identity_window();
        self.map_kernel_code(image);
        self.map_kernel_data(image);
        self.table.set_state(TableState::Built);
        Ok(())
    }

    /// Installs the table and enables the MMU.
    ///
    /// Both TTBRs point at the table, TTBCR selects TTBR0 for the whole
    /// address space, domain 0 becomes a client, and SCTLR gets `M | XP`.
    /// Must run with interrupts disabled from code inside the identity
    /// window.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NotBuilt`] or [`LifecycleError::AlreadyActive`].
    pub fn activate<S: SystemControl>(&mut self, regs: &mut S) -> Result<(), LifecycleError> {
        match self.state() {
            TableState::Built => {}
            TableState::Uninitialized => return Err(LifecycleError::NotBuilt),
            TableState::BootstrapActive | TableState::Final => {
                return Err(LifecycleError::AlreadyActive);
            }
        }

        let base = self.table.base();
        regs.set_ttbr0(base);
        regs.set_ttbr1(base);
        regs.set_ttbcr(TTBCR_NO_SPLIT);
        regs.set_dacr(DACR_DOMAIN0_CLIENT);
        let control = regs.sctlr() | SCTLR_MMU_ENABLE | SCTLR_EXTENDED_PAGE_TABLES;
        regs.set_sctlr(control);

        self.table.set_state(TableState::BootstrapActive);
        Ok(())
    }

    /// Retires the identity window at address 0.
    ///
    /// Clears first-level entry 0 and invalidates the TLB entry for virtual
    /// address 0. Must run from the kernel code window.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NotActive`] before activation,
    /// [`LifecycleError::AlreadyFinal`] when called twice.
    pub fn finalize_unmap<S: SystemControl>(&mut self, regs: &mut S) -> Result<(), LifecycleError> {
        match self.state() {
            TableState::BootstrapActive => {}
            TableState::Uninitialized | TableState::Built => {
                return Err(LifecycleError::NotActive);
            }
            TableState::Final => return Err(LifecycleError::AlreadyFinal),
        }

        self.table.set_entry(IDENTITY_BASE, PageTableEntry::FAULT);
        regs.invalidate_tlb_entry(IDENTITY_BASE);
        self.table.set_state(TableState::Final);

        log::debug!("identity window at {IDENTITY_BASE} retired");
        Ok(())
    }

    /// Hands out a translator over the finished table.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NotActive`] until the table is final: only then is
    /// its content guaranteed not to change under the translator.
    pub fn into_translator(self) -> Result<AddressTranslator<'t>, LifecycleError> {
        if self.state() != TableState::Final {
            return Err(LifecycleError::NotActive);
        }
        Ok(AddressTranslator::new(self.table))
    }

    // =========================================================================
    // Boot mappings
    // =========================================================================

    fn map_physical_window(&mut self) {
        let mut vaddr = PHYS_WINDOW_BASE;
        let mut paddr = PHYS_WINDOW_TARGET;
        while vaddr < PHYS_WINDOW_END {
            let entry = PageTableEntry::section(paddr, AccessClass::KernelRw, true, KERNEL_DOMAIN);
            self.table.set_entry(vaddr, entry);
            vaddr = vaddr.add(SECTION_SIZE);
            paddr = paddr.add(SECTION_SIZE);
        }
    }

    fn map_identity_window(&mut self) {
        let target = Paddr::new(IDENTITY_BASE.as_u32());
        let entry = PageTableEntry::section(target, AccessClass::KernelRw, false, KERNEL_DOMAIN);
        self.table.set_entry(IDENTITY_BASE, entry);
    }

    fn map_kernel_code(&mut self, image: &KernelImage) {
        let coarse = self.table.coarse_base(CoarseSlot::KernelCode);
        self.table
            .set_entry(KERNEL_CODE_BASE, PageTableEntry::coarse(coarse, KERNEL_DOMAIN));

        let table = self.table.coarse_mut(CoarseSlot::KernelCode);
        for frame in image.code_frames() {
            let paddr = Paddr::new(frame * PAGE_SIZE);
            let entry = CoarseEntry::small_page(paddr, AccessClass::KernelRo, false);
            table.set(frame as usize, entry);
        }
    }

    fn map_kernel_data(&mut self, image: &KernelImage) {
        let coarse = self.table.coarse_base(CoarseSlot::KernelData);
        self.table
            .set_entry(KERNEL_DATA_BASE, PageTableEntry::coarse(coarse, KERNEL_DOMAIN));

        let table = self.table.coarse_mut(CoarseSlot::KernelData);
        for index in 0..image.data_frames() {
            let paddr = image.data_start.add(index * PAGE_SIZE);
            let entry = CoarseEntry::small_page(paddr, AccessClass::KernelRw, true);
            table.set(index as usize, entry);
        }
    }
}

impl fmt::Debug for PageTableBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageTableBuilder")
            .field("table", &self.table)
            .finish()
    }
}

/// Virtual address the kernel code window maps a physical address to.
///
/// Only meaningful for addresses inside the first MiB, where the image is
/// loaded.
#[must_use]
pub const fn kernel_code_vaddr(paddr: Paddr) -> Vaddr {
    KERNEL_CODE_BASE.add(paddr.as_u32() & (SECTION_SIZE - 1))
}
