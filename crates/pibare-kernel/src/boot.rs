// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The boot sequence.
//!
//! Split at the jump into high memory:
//!
//! - [`early_init`] runs at physical addresses with the MMU off. It may not
//!   log, and may not touch anything but its arguments.
//! - [`kernel_main`] runs in the kernel code window with the logger
//!   installed. It owns the table from then on.
//!
//! Both return a [`FatalCode`] on failure; the caller reports it and halts.

use core::fmt;

use log::{debug, error, info, warn};
use pibare_abi::{BootArgs, FatalCode, Paddr};
use pibare_mailbox::queries::COMMAND_LINE_BYTES;
use pibare_mailbox::{
    BusAddress, Framebuffer, FramebufferRequest, MailboxChannel, MemoryReport, PropertyBuffer,
    PropertyClient,
};
use pibare_mmu::{KernelImage, PageTableBuilder, SystemControl, TranslationTable};

/// Builds the boot translation table at `table_base` and enables the MMU.
///
/// `table` must be the storage at physical `table_base`: the MMU starts
/// walking that address as soon as this returns.
///
/// # Errors
///
/// [`FatalCode::PageTableLifecycle`] if the table cannot be built or
/// activated.
pub fn early_init<S: SystemControl>(
    table: &mut TranslationTable,
    table_base: Paddr,
    image: &KernelImage,
    regs: &mut S,
) -> Result<(), FatalCode> {
    let mut builder = PageTableBuilder::new(table);
    builder
        .build_bootstrap_tables(table_base, image)
        .map_err(|_| FatalCode::PageTableLifecycle)?;
    builder
        .activate(regs)
        .map_err(|_| FatalCode::PageTableLifecycle)
}

/// The kernel command line as reported by the firmware.
#[derive(Clone, Copy)]
pub struct CommandLine {
    bytes: [u8; COMMAND_LINE_BYTES as usize],
    len: usize,
}

impl CommandLine {
    /// An empty command line.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            bytes: [0; COMMAND_LINE_BYTES as usize],
            len: 0,
        }
    }

    /// The line as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes[..self.len]).unwrap_or_default()
    }

    /// Checks whether the firmware reported nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for CommandLine {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CommandLine").field(&self.as_str()).finish()
    }
}

/// What the kernel learned while booting.
#[derive(Debug, Clone, Copy)]
pub struct BootReport {
    /// Registers handed over by the loader.
    pub args: BootArgs,
    /// The negotiated display.
    pub framebuffer: Framebuffer,
    /// ARM/VideoCore memory split, if the firmware answered.
    pub memory: Option<MemoryReport>,
    /// Kernel command line; empty if the firmware did not answer.
    pub command_line: CommandLine,
}

/// Finishes the boot from the kernel code window.
///
/// Retires the identity window, then talks to the VideoCore through
/// `mailbox`, using `buffer` as the shared message. The framebuffer is
/// required; the memory split and the command line are only reported.
///
/// # Errors
///
/// - [`FatalCode::PageTableLifecycle`] if the table is not in its
///   bootstrap state
/// - [`FatalCode::MailboxBufferUnmapped`] if `buffer` has no physical
///   address
/// - the framebuffer step's code if negotiation fails
pub fn kernel_main<S: SystemControl, M: MailboxChannel>(
    table: &mut TranslationTable,
    regs: &mut S,
    mailbox: M,
    buffer: &PropertyBuffer,
    args: BootArgs,
) -> Result<BootReport, FatalCode> {
    info!("pibare {} booting", crate::VERSION);

    let mut builder = PageTableBuilder::new(table);
    builder.finalize_unmap(regs).map_err(|err| {
        error!("cannot retire identity window: {err}");
        FatalCode::PageTableLifecycle
    })?;
    let translator = builder.into_translator().map_err(|err| {
        error!("translation table unusable: {err}");
        FatalCode::PageTableLifecycle
    })?;

    report_boot_args(&args);

    let address = translator.bus_address(buffer).map_err(|err| {
        error!("mailbox buffer: {err}");
        FatalCode::MailboxBufferUnmapped
    })?;
    debug!("mailbox buffer at {address}");

    let mut client = PropertyClient::new(mailbox, translator, buffer);
    let framebuffer = client
        .negotiate_framebuffer(FramebufferRequest::default())
        .map_err(|err| {
            error!("{err}");
            err.fatal_code()
        })?;

    let memory = match client.memory_report() {
        Ok(report) => {
            info!("ARM memory:       {}", report.arm);
            info!("VideoCore memory: {}", report.videocore);
            Some(report)
        }
        Err(err) => {
            warn!("memory report unavailable: {err}");
            None
        }
    };

    let mut command_line = CommandLine::empty();
    match client.command_line(&mut command_line.bytes) {
        Ok(line) => {
            command_line.len = line.len();
            info!("command line: {line}");
        }
        Err(err) => warn!("command line unavailable: {err}"),
    }

    Ok(BootReport {
        args,
        framebuffer,
        memory,
        command_line,
    })
}

fn report_boot_args(args: &BootArgs) {
    if args.is_expected_board() {
        info!("machine type {}", args.machine_type);
    } else {
        warn!("machine type {}, continuing anyway", args.machine_type);
    }
    if args.r0 != 0 {
        warn!("loader passed r0 = {:#x}, expected 0", args.r0);
    }
    debug!("boot tags at {}", args.atags);
}
