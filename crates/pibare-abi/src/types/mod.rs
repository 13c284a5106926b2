// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Core address types.
//!
//! These newtypes prevent accidentally passing a CPU-visible address where the
//! hardware or the co-processor expects a physical one.

mod addr;


pub use addr::{Paddr, Vaddr};
