//! Single-byte port I/O
//!
//! The protocol driver only ever needs to read or write one byte at a fixed
//! I/O address. [`PortIo`] is that capability; implementations decide how the
//! byte reaches the hardware.

use smcfan_core::{Result, SmcError};
use tracing::{debug, warn};

/// Byte-wide access to the I/O port space
pub trait PortIo: Send {
    /// Read one byte from `port`
    fn read_byte(&mut self, port: u16) -> u8;

    /// Write one byte to `port`
    fn write_byte(&mut self, port: u16, value: u8);
}

impl<P: PortIo + ?Sized> PortIo for Box<P> {
    fn read_byte(&mut self, port: u16) -> u8 {
        (**self).read_byte(port)
    }

    fn write_byte(&mut self, port: u16, value: u8) {
        (**self).write_byte(port, value)
    }
}

/// Port I/O through the Linux `/dev/port` character device
///
/// Each byte is a positioned read or write at offset `port`. Requires
/// `CAP_SYS_RAWIO` (in practice: root).
#[cfg(unix)]
pub struct DevPort {
    file: std::fs::File,
}

#[cfg(unix)]
impl DevPort {
    pub const DEFAULT_PATH: &'static str = "/dev/port";

    /// Open `/dev/port`
    pub fn open() -> Result<Self> {
        Self::open_path(Self::DEFAULT_PATH)
    }

    /// Open a port device at `path`
    pub fn open_path(path: &str) -> Result<Self> {
        debug!("Opening port device: {}", path);
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                SmcError::DeviceError {
                    context: format!("Failed to open {}: {}", path, e),
                    code: None,
                }
            })?;
        Ok(Self { file })
    }
}

#[cfg(unix)]
impl PortIo for DevPort {
    fn read_byte(&mut self, port: u16) -> u8 {
        use std::os::unix::fs::FileExt;

        let mut buf = [0u8; 1];
        match self.file.read_at(&mut buf, port as u64) {
            Ok(1) => buf[0],
            Ok(_) => {
                warn!("Short read from port 0x{:03X}", port);
                0xFF
            }
            Err(e) => {
                warn!("Read from port 0x{:03X} failed: {}", port, e);
                0xFF
            }
        }
    }

    fn write_byte(&mut self, port: u16, value: u8) {
        use std::os::unix::fs::FileExt;

        if let Err(e) = self.file.write_at(&[value], port as u64) {
            warn!("Write to port 0x{:03X} failed: {}", port, e);
        }
    }
}

/// Port I/O with the x86 `in`/`out` instructions
///
/// Only usable where the process has I/O privilege (ring 0, or after
/// `ioperm`/`iopl` on Linux).
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub struct RawPortIo {
    _private: (),
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl RawPortIo {
    /// # Safety
    ///
    /// The caller must hold I/O privilege for the SMC port range. Executing
    /// `in`/`out` without it faults the process.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl PortIo for RawPortIo {
    #[inline]
    fn read_byte(&mut self, port: u16) -> u8 {
        let value: u8;
        // SAFETY: privilege established by `RawPortIo::new`
        unsafe {
            core::arch::asm!(
                "in al, dx",
                out("al") value,
                in("dx") port,
                options(nomem, nostack, preserves_flags)
            );
        }
        value
    }

    #[inline]
    fn write_byte(&mut self, port: u16, value: u8) {
        // SAFETY: privilege established by `RawPortIo::new`
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") port,
                in("al") value,
                options(nomem, nostack, preserves_flags)
            );
        }
    }
}

/// Grant the process access to the SMC port range (Linux, x86 only)
#[cfg(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64")))]
pub fn request_port_access(first: u16, count: u16) -> Result<()> {
    extern "C" {
        fn ioperm(from: std::os::raw::c_ulong, num: std::os::raw::c_ulong, turn_on: i32) -> i32;
    }

    // SAFETY: ioperm only changes this process's I/O permission bitmap
    let rc = unsafe { ioperm(first as _, count as _, 1) };
    if rc != 0 {
        return Err(SmcError::Io(std::io::Error::last_os_error()));
    }
    debug!("I/O permission granted for 0x{:03X}+{}", first, count);
    Ok(())
}
