//! SMC protocol driver
//!
//! Runs the read, write and type-query command sequences over a [`PortIo`]
//! capability. Every sequence is:
//!
//! ```text
//! Idle → CommandSent → Acknowledged → KeySent → {DataReady | Complete} → Done
//! ```
//!
//! Each status wait polls the command port until its condition holds or its
//! deadline passes. There are no retries; the caller decides what a failure
//! means.

use std::sync::{Arc, Mutex};

use smcfan_core::smc::{error_code, CMD_PORT, DATA_PORT, ERR_PORT, IDENT_KEY, STATUS_ABSENT};
use smcfan_core::{
    Command, KeyInfo, ProtocolStep, Result, SmcError, SmcKey, StatusWait, Timing, MAX_DATA_LENGTH,
};
use tracing::{debug, error, info, warn};

use crate::port_io::PortIo;
use crate::timer::Timer;

/// Key-level access to the SMC
///
/// This trait is the seam between the protocol driver and everything built on
/// top of it. Fan control and sensor reading are generic over it, so they can
/// run against mocks in tests.
pub trait SmcTransport: Send {
    /// Read the value of `key`
    fn read_key(&mut self, key: SmcKey) -> Result<Vec<u8>>;

    /// Write `data` (1 to 32 bytes) to `key`
    fn write_key(&mut self, key: SmcKey, data: &[u8]) -> Result<()>;

    /// Query size, type and attributes of `key`
    fn query_key_type(&mut self, key: SmcKey) -> Result<KeyInfo>;
}

impl<T: SmcTransport + ?Sized> SmcTransport for Box<T> {
    fn read_key(&mut self, key: SmcKey) -> Result<Vec<u8>> {
        (**self).read_key(key)
    }

    fn write_key(&mut self, key: SmcKey, data: &[u8]) -> Result<()> {
        (**self).write_key(key, data)
    }

    fn query_key_type(&mut self, key: SmcKey) -> Result<KeyInfo> {
        (**self).query_key_type(key)
    }
}

/// State of one command sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub command: Command,
    pub key: SmcKey,
    pub step: ProtocolStep,
    /// Error byte sampled from the error port, if any
    pub error: Option<u8>,
}

impl Session {
    fn new(command: Command, key: SmcKey) -> Self {
        Self {
            command,
            key,
            step: ProtocolStep::Idle,
            error: None,
        }
    }
}

/// Protocol driver over a port I/O capability and a timer
pub struct SmcDriver<P: PortIo, C: Timer> {
    port: P,
    timer: C,
    timing: Timing,
    last_error: Option<u8>,
}

impl<P: PortIo, C: Timer> SmcDriver<P, C> {
    /// Create a driver with the default timing
    pub fn new(port: P, timer: C) -> Self {
        Self::with_timing(port, timer, Timing::default())
    }

    /// Create a driver with explicit timing
    pub fn with_timing(port: P, timer: C, timing: Timing) -> Self {
        Self {
            port,
            timer,
            timing,
            last_error: None,
        }
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Error byte sampled by the most recent sequence
    pub fn last_error(&self) -> Option<u8> {
        self.last_error
    }

    /// Clear the hardware error latch and forget the last error
    pub fn clear_error(&mut self) {
        self.send(CMD_PORT, Command::ClearError as u8);
        self.last_error = None;
    }

    /// Clear pending errors and check that something answers on the status port
    pub fn initialize(&mut self) -> Result<()> {
        self.clear_error();

        let status = self.port.read_byte(CMD_PORT);
        if status == STATUS_ABSENT {
            error!("SMC status port reads 0x{:02X}, no hardware", status);
            return Err(SmcError::Unsupported(format!(
                "no SMC at port 0x{:03X}",
                CMD_PORT
            )));
        }

        debug!("SMC status after init: 0x{:02X}", status);
        Ok(())
    }

    /// `true` iff the identification key reads back at least one byte
    pub fn detect(&mut self) -> bool {
        let Ok(key) = SmcKey::new(IDENT_KEY) else {
            return false;
        };
        match self.read_key(key) {
            Ok(bytes) if !bytes.is_empty() => {
                info!("SMC detected, revision {:02X?}", bytes);
                true
            }
            Ok(_) => {
                warn!("SMC identification key returned no data");
                false
            }
            Err(e) => {
                warn!("SMC not detected: {}", e);
                false
            }
        }
    }

    /// Write one byte, then the inter-byte delay
    fn send(&mut self, port: u16, value: u8) {
        self.port.write_byte(port, value);
        self.timer.stall(self.timing.io_delay);
    }

    /// Read one data byte, then the inter-byte delay
    fn receive(&mut self) -> u8 {
        let value = self.port.read_byte(DATA_PORT);
        self.timer.stall(self.timing.io_delay);
        value
    }

    /// Poll the status port until `condition` holds or the deadline passes
    fn wait_status(&mut self, session: &Session, condition: StatusWait) -> Result<()> {
        let deadline = self.timer.now() + self.timing.timeout;
        loop {
            let status = self.port.read_byte(CMD_PORT);
            if condition.is_met(status) {
                return Ok(());
            }
            if self.timer.now() >= deadline {
                debug!(
                    "{} {}: status 0x{:02X} never matched {:?} ({})",
                    command_name(session.command),
                    session.key,
                    status,
                    condition,
                    session.step
                );
                return Err(SmcError::Timeout { step: session.step });
            }
            self.timer.stall(self.timing.poll_interval);
        }
    }

    fn sample_error(&mut self, session: &mut Session) -> u8 {
        let code = self.port.read_byte(ERR_PORT);
        session.error = Some(code);
        code
    }

    /// Command byte, ack, key bytes
    fn start(&mut self, session: &mut Session) -> Result<()> {
        self.send(CMD_PORT, session.command as u8);
        session.step = ProtocolStep::CommandSent;

        if self.wait_status(session, StatusWait::ACK).is_err() {
            let code = self.sample_error(session);
            error!(
                "{} {} not acknowledged (error 0x{:02X})",
                command_name(session.command),
                session.key,
                code
            );
            return Err(SmcError::DeviceError {
                context: format!(
                    "{} {} not acknowledged",
                    command_name(session.command),
                    session.key
                ),
                code: Some(code),
            });
        }
        session.step = ProtocolStep::Acknowledged;

        for &byte in session.key.as_bytes() {
            self.send(DATA_PORT, byte);
        }
        session.step = ProtocolStep::KeySent;
        Ok(())
    }

    /// Wait for the response of a read or query
    fn await_data(&mut self, session: &mut Session) -> Result<()> {
        if self.wait_status(session, StatusWait::DATA_READY).is_err() {
            let code = self.sample_error(session);
            if code == error_code::NO_SUCH_KEY {
                debug!("Key {} does not exist", session.key);
                return Err(SmcError::NotFound(format!("key {}", session.key)));
            }
            error!(
                "No data for {} {} (error 0x{:02X})",
                command_name(session.command),
                session.key,
                code
            );
            return Err(SmcError::DeviceError {
                context: format!("no data for {}", session.key),
                code: Some(code),
            });
        }
        session.step = ProtocolStep::DataReady;
        Ok(())
    }

    fn read_sequence(&mut self, session: &mut Session) -> Result<Vec<u8>> {
        self.start(session)?;
        self.await_data(session)?;

        let len = (self.receive() as usize).min(MAX_DATA_LENGTH);
        let data: Vec<u8> = (0..len).map(|_| self.receive()).collect();

        self.wait_status(session, StatusWait::COMPLETE)?;
        session.step = ProtocolStep::Done;

        debug!("RX {}: {:02X?}", session.key, data);
        Ok(data)
    }

    fn write_sequence(&mut self, session: &mut Session, data: &[u8]) -> Result<()> {
        self.start(session)?;

        debug!("TX {}: {:02X?}", session.key, data);
        self.send(DATA_PORT, data.len() as u8);
        for &byte in data {
            self.send(DATA_PORT, byte);
        }
        session.step = ProtocolStep::Complete;

        if self.wait_status(session, StatusWait::COMPLETE).is_err() {
            let code = self.sample_error(session);
            return Err(match code {
                error_code::READ_ONLY => {
                    warn!("Key {} is read-only", session.key);
                    SmcError::WriteProtected(session.key)
                }
                error_code::NO_SUCH_KEY => SmcError::NotFound(format!("key {}", session.key)),
                _ => {
                    error!("Write to {} failed (error 0x{:02X})", session.key, code);
                    SmcError::DeviceError {
                        context: format!("write to {} not completed", session.key),
                        code: Some(code),
                    }
                }
            });
        }
        session.step = ProtocolStep::Done;
        Ok(())
    }

    fn query_sequence(&mut self, session: &mut Session) -> Result<KeyInfo> {
        self.start(session)?;
        self.await_data(session)?;

        let data_size = self.receive();
        let type_bytes: Vec<u8> = (0..4).map(|_| self.receive()).collect();
        let attributes = self.receive();

        self.wait_status(session, StatusWait::COMPLETE)?;
        session.step = ProtocolStep::Done;

        let info = KeyInfo {
            data_size,
            data_type: String::from_utf8_lossy(&type_bytes).into_owned(),
            attributes,
        };
        debug!("Key {}: {:?}", session.key, info);
        Ok(info)
    }

    /// Run one sequence and record its error byte
    fn run<R>(
        &mut self,
        command: Command,
        key: SmcKey,
        sequence: impl FnOnce(&mut Self, &mut Session) -> Result<R>,
    ) -> Result<R> {
        let mut session = Session::new(command, key);
        let result = sequence(self, &mut session);
        self.last_error = session.error;
        result
    }
}

impl<P: PortIo, C: Timer> SmcTransport for SmcDriver<P, C> {
    fn read_key(&mut self, key: SmcKey) -> Result<Vec<u8>> {
        self.run(Command::Read, key, |driver, session| {
            driver.read_sequence(session)
        })
    }

    fn write_key(&mut self, key: SmcKey, data: &[u8]) -> Result<()> {
        if data.is_empty() || data.len() > MAX_DATA_LENGTH {
            return Err(SmcError::InvalidParameter(format!(
                "payload for {} must be 1-{} bytes, got {}",
                key,
                MAX_DATA_LENGTH,
                data.len()
            )));
        }
        self.run(Command::Write, key, |driver, session| {
            driver.write_sequence(session, data)
        })
    }

    fn query_key_type(&mut self, key: SmcKey) -> Result<KeyInfo> {
        self.run(Command::QueryType, key, |driver, session| {
            driver.query_sequence(session)
        })
    }
}

fn command_name(command: Command) -> &'static str {
    match command {
        Command::ClearError => "clear",
        Command::Read => "read",
        Command::Write => "write",
        Command::GetKeyByIndex => "enumerate",
        Command::QueryType => "query",
    }
}

/// Shared access to one transport
///
/// Clones refer to the same transport. The lock is held for a whole command
/// sequence, so sequences from different holders never interleave.
pub struct SmcHandle<T: ?Sized> {
    inner: Arc<Mutex<Box<T>>>,
}

impl<T> SmcHandle<T> {
    pub fn new(transport: T) -> Self {
        Self::from_box(Box::new(transport))
    }
}

impl<T: ?Sized> SmcHandle<T> {
    pub fn from_box(transport: Box<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(transport)),
        }
    }

    /// Run `f` with exclusive access to the transport
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| SmcError::device("SMC lock poisoned"))?;
        Ok(f(&mut **guard))
    }
}

impl<T: ?Sized> Clone for SmcHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: SmcTransport + ?Sized> SmcTransport for SmcHandle<T> {
    fn read_key(&mut self, key: SmcKey) -> Result<Vec<u8>> {
        self.with(|t| t.read_key(key))?
    }

    fn write_key(&mut self, key: SmcKey, data: &[u8]) -> Result<()> {
        self.with(|t| t.write_key(key, data))?
    }

    fn query_key_type(&mut self, key: SmcKey) -> Result<KeyInfo> {
        self.with(|t| t.query_key_type(key))?
    }
}
