//! SMC wire layout
//!
//! Port addresses, command bytes, status bits and hardware error codes of the
//! SMC port interface, plus the protocol step names used in errors and logs.
//!
//! Note: actual port I/O lives in the `smcfan-hardware` crate. This module only
//! holds the byte layout and timing defaults.

use std::fmt;
use std::time::Duration;

/// Data read/write port
pub const DATA_PORT: u16 = 0x300;
/// Command port (write) and status port (read)
pub const CMD_PORT: u16 = 0x304;
/// Error status port
pub const ERR_PORT: u16 = 0x31E;

/// Maximum payload length of one key
pub const MAX_DATA_LENGTH: usize = 32;

/// Number of fan indices probed (`F0..F5`)
pub const MAX_FANS: usize = 6;

/// Identification key present on every SMC (`REV `)
pub const IDENT_KEY: &str = "REV ";

/// Status value returned by an unpopulated I/O range
pub const STATUS_ABSENT: u8 = 0xFF;

/// Commands written to [`CMD_PORT`]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Clear a pending error latch (0x00)
    ClearError = 0x00,
    /// Read a key value (0x10)
    Read = 0x10,
    /// Write a key value (0x11)
    Write = 0x11,
    /// Enumerate keys by index (0x12), defined but unused
    GetKeyByIndex = 0x12,
    /// Query a key's size and type (0x13)
    QueryType = 0x13,
}

impl Command {
    /// Decode a command byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Command::ClearError),
            0x10 => Some(Command::Read),
            0x11 => Some(Command::Write),
            0x12 => Some(Command::GetKeyByIndex),
            0x13 => Some(Command::QueryType),
            _ => None,
        }
    }
}

/// Status bits read from [`CMD_PORT`]. Bits are not exclusive.
pub mod status {
    /// Data available for reading
    pub const DATA_READY: u8 = 0x01;
    /// Device busy with a command
    pub const BUSY: u8 = 0x02;
    /// Command acknowledged
    pub const ACK: u8 = 0x04;
    /// New command received
    pub const NEW_CMD: u8 = 0x08;
}

/// Error codes read from [`ERR_PORT`]
pub mod error_code {
    /// Previous command interrupted
    pub const CMD_INTERRUPTED: u8 = 0x80;
    /// Still processing a bad command
    pub const STILL_BAD_CMD: u8 = 0x81;
    /// Bad or invalid command
    pub const BAD_CMD: u8 = 0x82;
    /// Key does not exist
    pub const NO_SUCH_KEY: u8 = 0x84;
    /// Key is write-only
    pub const WRITE_ONLY: u8 = 0x85;
    /// Key is read-only
    pub const READ_ONLY: u8 = 0x86;
    /// Invalid key index
    pub const BAD_INDEX: u8 = 0xB8;
}

/// A condition the status register is polled for: `(status & mask) == expect`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusWait {
    pub mask: u8,
    pub expect: u8,
}

impl StatusWait {
    /// Command acknowledged
    pub const ACK: StatusWait = StatusWait::set(status::ACK);
    /// Data ready to be read
    pub const DATA_READY: StatusWait = StatusWait::set(status::DATA_READY);
    /// Command complete: no busy bit, whatever else is set
    pub const COMPLETE: StatusWait = StatusWait::clear(status::BUSY);

    /// Wait until all `bits` are set
    pub const fn set(bits: u8) -> Self {
        Self {
            mask: bits,
            expect: bits,
        }
    }

    /// Wait until all `bits` are clear
    pub const fn clear(bits: u8) -> Self {
        Self {
            mask: bits,
            expect: 0,
        }
    }

    /// Test a sampled status byte
    pub const fn is_met(&self, status: u8) -> bool {
        status & self.mask == self.expect
    }
}

/// Steps of one command sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolStep {
    Idle,
    CommandSent,
    Acknowledged,
    KeySent,
    DataReady,
    Complete,
    Done,
}

impl fmt::Display for ProtocolStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolStep::Idle => "idle",
            ProtocolStep::CommandSent => "command sent",
            ProtocolStep::Acknowledged => "acknowledged",
            ProtocolStep::KeySent => "key sent",
            ProtocolStep::DataReady => "data ready",
            ProtocolStep::Complete => "complete",
            ProtocolStep::Done => "done",
        };
        f.write_str(name)
    }
}

/// Poll and delay timing of the protocol driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Sleep between two status samples
    pub poll_interval: Duration,
    /// Delay after every byte written to or read from a port
    pub io_delay: Duration,
    /// Ceiling of one status wait
    pub timeout: Duration,
}

impl Timing {
    pub const DEFAULT_POLL_INTERVAL_US: u64 = 10;
    pub const DEFAULT_IO_DELAY_US: u64 = 10;
    pub const DEFAULT_TIMEOUT_MS: u64 = 100;
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_micros(Self::DEFAULT_POLL_INTERVAL_US),
            io_delay: Duration::from_micros(Self::DEFAULT_IO_DELAY_US),
            timeout: Duration::from_millis(Self::DEFAULT_TIMEOUT_MS),
        }
    }
}
