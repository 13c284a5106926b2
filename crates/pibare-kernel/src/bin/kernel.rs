// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! pibare kernel image.
//!
//! `_start` is the first instruction the firmware runs, at physical
//! `0x8000` with the MMU off. It zeroes `.bss` and the table storage, calls
//! [`boot_early_init`] with everything it needs in registers, then switches
//! to the high stack and jumps to [`boot_kernel_main`] in the kernel code
//! window. r0-r2 from the loader survive the whole trip.

#![no_std]
#![no_main]

use core::cell::UnsafeCell;
use core::panic::PanicInfo;

use log::LevelFilter;
use pibare_abi::layout::physical_to_virtual;
use pibare_abi::{BootArgs, FatalCode, Paddr};
use pibare_kernel::fatal::{FatalReporter, LedReporter, ReportSpace};
use pibare_kernel::gpio::{ActLed, GPIO_PADDR};
use pibare_kernel::uart::{PL011_PADDR, Pl011Writer};
use pibare_kernel::{UartLogger, boot};
use pibare_mailbox::channel::MAILBOX_PADDR;
use pibare_mailbox::{Bcm2835Mailbox, PropertyBuffer};
use pibare_mmu::{Cp15, KernelImage, TranslationTable};

core::arch::global_asm!(
    r#"
    .section .text.boot, "ax"
    .global _start
    .arm
_start:
    mov     sp, #0x8000
    push    {{r0, r1, r2}}

    @ Zero .bss and the table storage through their physical addresses
    ldr     r3, =__bss_start_phys
    ldr     r4, =__image_end_phys
    mov     r5, #0
1:  cmp     r3, r4
    strlo   r5, [r3], #4
    blo     1b

    @ KernelImage on the stack, in field order
    ldr     r0, =__kernel_load_start
    ldr     r1, =__data_phys
    ldr     r2, =__init_end_phys
    ldr     r3, =__image_end_phys
    push    {{r0, r1, r2, r3}}
    ldr     r0, =__pagetable_phys
    mov     r1, sp
    bl      boot_early_init
    add     sp, sp, #16

    @ MMU is on; continue in the kernel code window
    pop     {{r0, r1, r2}}
    ldr     sp, ={high_stack}
    ldr     pc, =boot_kernel_main
    .ltorg
"#,
    high_stack = const HIGH_STACK_TOP,
);

/// Boot stack top seen through the physical window.
const HIGH_STACK_TOP: u32 = 0x8000_8000;

/// Storage for the boot translation table, placed by the linker script.
#[repr(transparent)]
struct BootTable(UnsafeCell<TranslationTable>);

// SAFETY: single core; only the boot sequence touches the table.
unsafe impl Sync for BootTable {}

#[unsafe(link_section = ".pagetable")]
static BOOT_TABLE: BootTable = BootTable(UnsafeCell::new(TranslationTable::new()));

/// The property message shared with the VideoCore.
#[repr(transparent)]
struct SharedBuffer(PropertyBuffer);

// SAFETY: single core; the firmware only touches the buffer while a request
// is in flight, and the client owns it for that time.
unsafe impl Sync for SharedBuffer {}

static PROPERTY_BUFFER: SharedBuffer = SharedBuffer(PropertyBuffer::new());

/// Window address of a peripheral register block.
const fn window(paddr: Paddr) -> *mut u32 {
    match physical_to_virtual(paddr) {
        Some(vaddr) => vaddr.as_u32() as usize as *mut u32,
        None => core::ptr::null_mut(),
    }
}

static LOGGER: UartLogger<Pl011Writer> = UartLogger::new(
    // SAFETY: the physical window is mapped before the logger is installed.
    unsafe { Pl011Writer::new(window(PL011_PADDR)) },
    LevelFilter::Debug,
);

/// Reports `code` on the ACT LED forever.
fn halt(code: FatalCode, space: ReportSpace) -> ! {
    let gpio = space.peripheral(GPIO_PADDR).unwrap_or(0) as usize as *mut u32;
    // SAFETY: `gpio` is the GPIO block as seen from `space`.
    let led = unsafe { ActLed::new(gpio) };
    LedReporter::new(led).report_fatal(code)
}

/// Builds the boot table and enables the MMU. Runs at physical addresses.
///
/// # Safety
///
/// Called once from `_start` with the MMU off; `table` is the physical
/// address of [`BOOT_TABLE`] and `image` points at a valid [`KernelImage`].
#[unsafe(no_mangle)]
unsafe extern "C" fn boot_early_init(table: *mut TranslationTable, image: *const KernelImage) {
    // SAFETY: guaranteed by the caller; the storage was just zeroed, which
    // is a valid uninitialized table.
    let (table_ref, image) = unsafe { (&mut *table, &*image) };
    // SAFETY: privileged mode, interrupts still off from the loader.
    let mut regs = unsafe { Cp15::new() };
    let base = Paddr::new(table as usize as u32);
    if let Err(code) = boot::early_init(table_ref, base, image, &mut regs) {
        halt(code, ReportSpace::Physical);
    }
}

/// The kernel proper, entered from `_start` in the kernel code window.
#[unsafe(no_mangle)]
extern "C" fn boot_kernel_main(r0: u32, r1: u32, r2: u32) -> ! {
    let args = BootArgs::from_registers(r0, r1, r2);

    // SAFETY: nothing else runs; the UART is reachable through the window.
    // Installing can only fail if a logger exists already.
    let _ = unsafe { UartLogger::install(&LOGGER) };

    // SAFETY: the table is only ever touched from here on.
    let table = unsafe { &mut *BOOT_TABLE.0.get() };
    // SAFETY: privileged mode, interrupts off.
    let mut regs = unsafe { Cp15::new() };
    // SAFETY: the mailbox is reachable through the window and unused so far.
    let mailbox = unsafe { Bcm2835Mailbox::new(window(MAILBOX_PADDR)) };

    match boot::kernel_main(table, &mut regs, mailbox, &PROPERTY_BUFFER.0, args) {
        Ok(report) => {
            log::info!(
                "boot complete: {}x{} framebuffer, command line {:?}",
                report.framebuffer.width,
                report.framebuffer.height,
                report.command_line.as_str()
            );
            loop {
                // SAFETY: wait for interrupt (CP15 form); interrupts stay
                // off, so this parks the core.
                unsafe {
                    core::arch::asm!("mcr p15, 0, {}, c7, c0, 4", in(reg) 0_u32, options(nostack));
                }
            }
        }
        Err(code) => {
            log::error!("fatal: {code}");
            halt(code, ReportSpace::Window)
        }
    }
}

#[panic_handler]
fn panic(info: &PanicInfo<'_>) -> ! {
    // SAFETY: only reads SCTLR.
    let regs = unsafe { Cp15::new() };
    let space = ReportSpace::current(&regs);
    if space.can_log() {
        log::error!("panic: {info}");
    }
    halt(FatalCode::KernelPanic, space)
}
