// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Write-only UART output for the kernel log.
//!
//! The boot core never reads from the UART, so the interface only writes.

#[cfg(target_arch = "arm")]
mod pl011;

#[cfg(target_arch = "arm")]
pub use pl011::{PL011_PADDR, Pl011Writer};

/// Write-only UART interface.
pub trait UartWriter {
    /// Write a single byte.
    fn write_byte(&mut self, byte: u8);

    /// Write a string, expanding `\n` to `\r\n` for serial terminals.
    fn write_str(&mut self, s: &str) {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
    }

    /// Write a string followed by a newline.
    fn write_line(&mut self, s: &str) {
        self.write_str(s);
        self.write_str("\n");
    }
}

/// Adapter for `core::fmt` formatting into a [`UartWriter`].
pub(crate) struct FmtWriter<'w, W: ?Sized>(pub(crate) &'w mut W);

impl<W: UartWriter + ?Sized> core::fmt::Write for FmtWriter<'_, W> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.0.write_str(s);
        Ok(())
    }
}

/// UART that collects everything written to it.
///
/// Clones share one output buffer, so a test can hand a clone to a logger
/// and inspect the one it kept.
#[cfg(any(test, feature = "std"))]
#[derive(Debug, Clone, Default)]
pub struct MockUart {
    output: std::sync::Arc<std::sync::Mutex<std::vec::Vec<u8>>>,
}

#[cfg(any(test, feature = "std"))]
impl MockUart {
    /// Creates an empty UART.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    #[must_use]
    pub fn output(&self) -> std::string::String {
        let bytes = self
            .output
            .lock()
            .map(|bytes| bytes.clone())
            .unwrap_or_default();
        std::string::String::from_utf8_lossy(&bytes).into_owned()
    }
}

#[cfg(any(test, feature = "std"))]
impl UartWriter for MockUart {
    fn write_byte(&mut self, byte: u8) {
        if let Ok(mut output) = self.output.lock() {
            output.push(byte);
        }
    }
}
