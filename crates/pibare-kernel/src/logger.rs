// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Kernel logger on top of a [`UartWriter`].
//!
//! Each record becomes one line:
//!
//! ```text
//! [ INFO] pibare_mailbox::framebuffer: framebuffer 640x480 at 0x1c006000 ...
//! ```
//!
//! There is no buffering and no lock: the boot core runs on one CPU with
//! interrupts disabled, so a record is always written in one piece.

use core::cell::UnsafeCell;
use core::fmt::Write;

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::uart::{FmtWriter, UartWriter};

/// A `log` backend writing straight to a UART.
pub struct UartLogger<W> {
    writer: UnsafeCell<W>,
    level: LevelFilter,
}

// SAFETY: single core with interrupts disabled; `log` is never entered
// concurrently.
unsafe impl<W: Send> Sync for UartLogger<W> {}

impl<W: UartWriter> UartLogger<W> {
    /// Creates a logger passing records up to `level`.
    pub const fn new(writer: W, level: LevelFilter) -> Self {
        Self {
            writer: UnsafeCell::new(writer),
            level,
        }
    }

    /// Most verbose level written.
    #[must_use]
    pub const fn level(&self) -> LevelFilter {
        self.level
    }
}

impl<W: UartWriter + Send> UartLogger<W> {
    /// Installs `logger` as the global `log` backend.
    ///
    /// # Safety
    ///
    /// Must be called once, before any other code logs, while nothing else
    /// runs: `log::set_logger_racy` is the only installer that works without
    /// compare-and-swap atomics.
    ///
    /// # Errors
    ///
    /// `SetLoggerError` if a logger is already installed.
    pub unsafe fn install(logger: &'static Self) -> Result<(), SetLoggerError>
    where
        W: 'static,
    {
        // SAFETY: forwarded to the caller.
        unsafe { log::set_logger_racy(logger)? };
        log::set_max_level(logger.level);
        Ok(())
    }
}

const fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => " WARN",
        Level::Info => " INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

impl<W: UartWriter + Send> Log for UartLogger<W> {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // SAFETY: see the `Sync` impl; no other reference is live.
        let writer = unsafe { &mut *self.writer.get() };
        let _ = writeln!(
            FmtWriter(writer),
            "[{}] {}: {}",
            level_tag(record.level()),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}
