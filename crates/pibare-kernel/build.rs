// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Build script for the pibare kernel.
//!
//! - Exports `PIBARE_VERSION` for the boot banner
//! - Adds the linker script for bare-metal ARM builds

fn main() {
    let version = std::env::var("PIBARE_VERSION")
        .or_else(|_| std::env::var("CARGO_PKG_VERSION"))
        .unwrap_or_default();
    println!("cargo::rustc-env=PIBARE_VERSION={version}");
    println!("cargo::rerun-if-env-changed=PIBARE_VERSION");

    // Only the bare-metal binary gets the kernel layout; host test builds
    // link normally.
    let target = std::env::var("TARGET").unwrap_or_default();
    if target.starts_with("arm") && target.ends_with("-none-eabi") {
        let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_default();
        let linker_script = format!("{manifest_dir}/link.ld");
        if std::path::Path::new(&linker_script).exists() {
            println!("cargo::rustc-link-arg-bins=-T{linker_script}");
            println!("cargo::rerun-if-changed={linker_script}");
        }
    }
}
