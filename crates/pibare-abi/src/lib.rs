// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Hardware and firmware facts shared by every pibare crate.
//!
//! Nothing in here is configuration. The values are fixed by the ARM1176
//! translation-table format, the BCM2835 address map, the boot loader and the
//! VideoCore firmware:
//! - Address newtypes (`Paddr`, `Vaddr`) for the 32-bit address space
//! - The fixed virtual address space layout
//! - The boot entry contract (registers handed over by the loader)
//! - The property-tag catalog and message codes
//! - Fatal diagnostic codes blinked on the OK LED
//!
//! # Design Principles
//!
//! - **No dependencies**: Pure data types, 100% host-testable
//! - **32-bit only**: The target is a single-core ARMv6 board

#![cfg_attr(not(test), no_std)]

pub mod boot;
pub mod fatal;
pub mod layout;
pub mod property;
pub mod types;

// Re-export commonly used types at crate root
pub use boot::{BootArgs, MachineType};
pub use fatal::FatalCode;
pub use property::TagId;
pub use types::{Paddr, Vaddr};
