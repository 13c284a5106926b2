// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Privileged register capability.
//!
//! The builder never touches CP15 directly. It receives a [`SystemControl`]
//! and issues every write through it, so the activation sequence can be
//! replayed against [`MockSystemControl`] on the host and checked word for
//! word.

use pibare_abi::{Paddr, Vaddr};

/// SCTLR.M: MMU enable.
pub const SCTLR_MMU_ENABLE: u32 = 1 << 0;

/// SCTLR.XP: ARMv6 extended page table format, subpages disabled.
pub const SCTLR_EXTENDED_PAGE_TABLES: u32 = 1 << 23;

/// TTBCR value selecting TTBR0 for the whole address space.
pub const TTBCR_NO_SPLIT: u32 = 0;

/// DACR value placing domain 0 in client mode (permission bits checked) and
/// every other domain in no-access mode.
pub const DACR_DOMAIN0_CLIENT: u32 = 0b01;

/// Narrow access to the CP15 registers the boot sequence needs.
///
/// Implementations must issue the writes in the order they are called. The
/// hardware implementation is only usable with interrupts disabled.
pub trait SystemControl {
    /// Writes translation table base register 0.
    fn set_ttbr0(&mut self, base: Paddr);

    /// Writes translation table base register 1.
    fn set_ttbr1(&mut self, base: Paddr);

    /// Writes the translation table base control register.
    fn set_ttbcr(&mut self, value: u32);

    /// Writes the domain access control register.
    fn set_dacr(&mut self, value: u32);

    /// Reads the system control register.
    fn sctlr(&self) -> u32;

    /// Writes the system control register.
    fn set_sctlr(&mut self, value: u32);

    /// Invalidates the unified TLB entry for one virtual address.
    ///
    /// Table writes preceding this call must be visible to the table walker
    /// before the entry is dropped.
    fn invalidate_tlb_entry(&mut self, vaddr: Vaddr);
}

// =============================================================================
// Hardware backend
// =============================================================================

/// CP15 backend for the ARM1176JZF-S.
#[cfg(target_arch = "arm")]
#[derive(Debug, Default)]
pub struct Cp15;

#[cfg(target_arch = "arm")]
impl Cp15 {
    /// Creates the backend.
    ///
    /// # Safety
    ///
    /// The caller must be in a privileged mode with interrupts disabled, and
    /// must hold the only instance.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self
    }

    /// Data synchronization barrier (ARMv6 CP15 form).
    #[inline]
    fn dsb() {
        // SAFETY: the barrier operation ignores the register value and has no
        // side effect besides ordering.
        unsafe {
            core::arch::asm!("mcr p15, 0, {}, c7, c10, 4", in(reg) 0_u32, options(nostack, preserves_flags));
        }
    }

    /// Prefetch flush (ARMv6 CP15 form of ISB).
    #[inline]
    fn isb() {
        // SAFETY: as for `dsb`.
        unsafe {
            core::arch::asm!("mcr p15, 0, {}, c7, c5, 4", in(reg) 0_u32, options(nostack, preserves_flags));
        }
    }
}

#[cfg(target_arch = "arm")]
impl SystemControl for Cp15 {
    fn set_ttbr0(&mut self, base: Paddr) {
        Self::dsb();
        // SAFETY: constructing `Cp15` required privileged mode.
        unsafe {
            core::arch::asm!("mcr p15, 0, {}, c2, c0, 0", in(reg) base.as_u32(), options(nostack, preserves_flags));
        }
    }

    fn set_ttbr1(&mut self, base: Paddr) {
        // SAFETY: constructing `Cp15` required privileged mode.
        unsafe {
            core::arch::asm!("mcr p15, 0, {}, c2, c0, 1", in(reg) base.as_u32(), options(nostack, preserves_flags));
        }
    }

    fn set_ttbcr(&mut self, value: u32) {
        // SAFETY: constructing `Cp15` required privileged mode.
        unsafe {
            core::arch::asm!("mcr p15, 0, {}, c2, c0, 2", in(reg) value, options(nostack, preserves_flags));
        }
    }

    fn set_dacr(&mut self, value: u32) {
        // SAFETY: constructing `Cp15` required privileged mode.
        unsafe {
            core::arch::asm!("mcr p15, 0, {}, c3, c0, 0", in(reg) value, options(nostack, preserves_flags));
        }
    }

    fn sctlr(&self) -> u32 {
        let value: u32;
        // SAFETY: reading SCTLR has no side effects.
        unsafe {
            core::arch::asm!("mrc p15, 0, {}, c1, c0, 0", out(reg) value, options(nomem, nostack, preserves_flags));
        }
        value
    }

    fn set_sctlr(&mut self, value: u32) {
        // SAFETY: constructing `Cp15` required privileged mode. Turning the
        // MMU on is only sound while the executing code is identity mapped,
        // which the builder's lifecycle guarantees.
        unsafe {
            core::arch::asm!("mcr p15, 0, {}, c1, c0, 0", in(reg) value, options(nostack, preserves_flags));
        }
        Self::isb();
    }

    fn invalidate_tlb_entry(&mut self, vaddr: Vaddr) {
        Self::dsb();
        // SAFETY: constructing `Cp15` required privileged mode.
        unsafe {
            core::arch::asm!("mcr p15, 0, {}, c8, c7, 1", in(reg) vaddr.as_u32(), options(nostack, preserves_flags));
        }
        Self::isb();
    }
}

// =============================================================================
// Host mock
// =============================================================================

/// A privileged register write recorded by [`MockSystemControl`].
#[cfg(any(test, feature = "std"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterWrite {
    /// `TTBR0 <- base`
    Ttbr0(Paddr),
    /// `TTBR1 <- base`
    Ttbr1(Paddr),
    /// `TTBCR <- value`
    Ttbcr(u32),
    /// `DACR <- value`
    Dacr(u32),
    /// `SCTLR <- value`
    Sctlr(u32),
    /// TLB invalidate by MVA.
    InvalidateTlbEntry(Vaddr),
}

/// Simulated CP15 register file.
///
/// Keeps the current register values and a log of every write in the order
/// it happened.
#[cfg(any(test, feature = "std"))]
#[derive(Debug, Clone)]
pub struct MockSystemControl {
    sctlr: u32,
    ttbr0: Paddr,
    ttbr1: Paddr,
    ttbcr: u32,
    dacr: u32,
    writes: std::vec::Vec<RegisterWrite>,
}

#[cfg(any(test, feature = "std"))]
impl MockSystemControl {
    /// ARM1176JZF-S reset value of SCTLR.
    pub const SCTLR_RESET: u32 = 0x0005_0078;

    /// Creates a register file in its reset state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sctlr: Self::SCTLR_RESET,
            ttbr0: Paddr::null(),
            ttbr1: Paddr::null(),
            ttbcr: 0,
            dacr: 0,
            writes: std::vec::Vec::new(),
        }
    }

    /// Every write so far, oldest first.
    #[must_use]
    pub fn writes(&self) -> &[RegisterWrite] {
        &self.writes
    }

    /// Current TTBR0 value.
    #[must_use]
    pub const fn ttbr0(&self) -> Paddr {
        self.ttbr0
    }

    /// Current TTBR1 value.
    #[must_use]
    pub const fn ttbr1(&self) -> Paddr {
        self.ttbr1
    }

    /// Current TTBCR value.
    #[must_use]
    pub const fn ttbcr(&self) -> u32 {
        self.ttbcr
    }

    /// Current DACR value.
    #[must_use]
    pub const fn dacr(&self) -> u32 {
        self.dacr
    }

    /// Checks SCTLR.M.
    #[must_use]
    pub const fn mmu_enabled(&self) -> bool {
        (self.sctlr & SCTLR_MMU_ENABLE) != 0
    }
}

#[cfg(any(test, feature = "std"))]
impl Default for MockSystemControl {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "std"))]
impl SystemControl for MockSystemControl {
    fn set_ttbr0(&mut self, base: Paddr) {
        self.ttbr0 = base;
        self.writes.push(RegisterWrite::Ttbr0(base));
    }

    fn set_ttbr1(&mut self, base: Paddr) {
        self.ttbr1 = base;
        self.writes.push(RegisterWrite::Ttbr1(base));
    }

    fn set_ttbcr(&mut self, value: u32) {
        self.ttbcr = value;
        self.writes.push(RegisterWrite::Ttbcr(value));
    }

    fn set_dacr(&mut self, value: u32) {
        self.dacr = value;
        self.writes.push(RegisterWrite::Dacr(value));
    }

    fn sctlr(&self) -> u32 {
        self.sctlr
    }

    fn set_sctlr(&mut self, value: u32) {
        self.sctlr = value;
        self.writes.push(RegisterWrite::Sctlr(value));
    }

    fn invalidate_tlb_entry(&mut self, vaddr: Vaddr) {
        self.writes.push(RegisterWrite::InvalidateTlbEntry(vaddr));
    }
}
