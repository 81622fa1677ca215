//! Simulated SMC
//!
//! A byte-level model of the SMC port interface. It answers the same command,
//! status and error port traffic as the hardware, so the full protocol driver
//! runs unchanged against it. Used by the tests and by `--backend simulated`.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use smcfan_core::codec::encode_rpm;
use smcfan_core::smc::{error_code, status, CMD_PORT, DATA_PORT, ERR_PORT, STATUS_ABSENT};
use smcfan_core::{Command, FanKey, SmcKey, MAX_DATA_LENGTH};
use tracing::debug;

use crate::port_io::PortIo;

/// Attribute bits reported by a type query
const ATTR_READ: u8 = 0x80;
const ATTR_WRITE: u8 = 0x40;

#[derive(Debug, Clone)]
struct SimKey {
    data_type: [u8; 4],
    value: Vec<u8>,
    read_only: bool,
}

#[derive(Debug, Default)]
enum Phase {
    #[default]
    Idle,
    Key {
        command: Command,
        bytes: Vec<u8>,
    },
    Output {
        key: SmcKey,
        bytes: VecDeque<u8>,
    },
    WriteLength(SmcKey),
    WriteData {
        key: SmcKey,
        len: usize,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Default)]
struct SimState {
    keys: BTreeMap<SmcKey, SimKey>,
    faults: HashMap<SmcKey, u8>,
    stalled: HashSet<SmcKey>,
    absent: bool,
    unresponsive: bool,
    phase: Phase,
    status: u8,
    error: u8,
    writes: Vec<(SmcKey, Vec<u8>)>,
    accesses: usize,
}

impl SimState {
    /// Abort the sequence: busy forever, error latched
    fn fail(&mut self, code: u8) {
        self.error = code;
        self.status = status::BUSY;
        self.phase = Phase::Idle;
    }

    fn output(&mut self, key: SmcKey, bytes: VecDeque<u8>) {
        self.status = status::DATA_READY | status::BUSY;
        self.phase = Phase::Output { key, bytes };
    }

    /// End of a sequence; a stalled key never drops the busy bit
    fn finish(&mut self, key: SmcKey) {
        self.status = if self.stalled.contains(&key) {
            status::BUSY
        } else {
            0
        };
        self.phase = Phase::Idle;
    }

    fn command(&mut self, value: u8) {
        if self.unresponsive {
            self.error = error_code::BAD_CMD;
            self.status = 0;
            return;
        }
        match Command::from_byte(value) {
            Some(Command::ClearError) => {
                self.error = 0;
                self.status = 0;
                self.phase = Phase::Idle;
            }
            Some(command @ (Command::Read | Command::Write | Command::QueryType)) => {
                self.status = status::ACK | status::BUSY;
                self.phase = Phase::Key {
                    command,
                    bytes: Vec::with_capacity(4),
                };
            }
            _ => {
                self.error = error_code::BAD_CMD;
                self.status = 0;
                self.phase = Phase::Idle;
            }
        }
    }

    fn data_in(&mut self, value: u8) {
        match std::mem::take(&mut self.phase) {
            Phase::Key { command, mut bytes } => {
                bytes.push(value);
                if bytes.len() < 4 {
                    self.phase = Phase::Key { command, bytes };
                    return;
                }
                let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
                match SmcKey::from_bytes(raw) {
                    Ok(key) => self.key_received(command, key),
                    Err(_) => self.fail(error_code::BAD_CMD),
                }
            }
            Phase::WriteLength(key) => {
                self.phase = Phase::WriteData {
                    key,
                    len: value as usize,
                    bytes: Vec::new(),
                };
            }
            Phase::WriteData {
                key,
                len,
                mut bytes,
            } => {
                bytes.push(value);
                if bytes.len() < len {
                    self.phase = Phase::WriteData { key, len, bytes };
                } else {
                    self.apply_write(key, bytes);
                }
            }
            // Stray byte outside a sequence
            other => self.phase = other,
        }
    }

    fn data_out(&mut self) -> u8 {
        let Phase::Output { key, bytes } = &mut self.phase else {
            return 0;
        };
        let value = bytes.pop_front().unwrap_or(0);
        if bytes.is_empty() {
            let key = *key;
            self.finish(key);
        }
        value
    }

    fn key_received(&mut self, command: Command, key: SmcKey) {
        if let Some(&code) = self.faults.get(&key) {
            self.fail(code);
            return;
        }
        if command == Command::Write {
            self.status = status::BUSY;
            self.phase = Phase::WriteLength(key);
            return;
        }
        let Some(entry) = self.keys.get(&key) else {
            self.fail(error_code::NO_SUCH_KEY);
            return;
        };

        let mut out = VecDeque::new();
        if command == Command::Read {
            out.push_back(entry.value.len() as u8);
            out.extend(entry.value.iter().copied());
        } else {
            let attributes = if entry.read_only {
                ATTR_READ
            } else {
                ATTR_READ | ATTR_WRITE
            };
            out.push_back(entry.value.len() as u8);
            out.extend(entry.data_type);
            out.push_back(attributes);
        }
        self.output(key, out);
    }

    fn apply_write(&mut self, key: SmcKey, bytes: Vec<u8>) {
        let Some(entry) = self.keys.get_mut(&key) else {
            self.fail(error_code::NO_SUCH_KEY);
            return;
        };
        if entry.read_only {
            self.fail(error_code::READ_ONLY);
            return;
        }

        entry.value = bytes.clone();
        self.writes.push((key, bytes.clone()));
        self.finish(key);

        self.fan_side_effects(key, &bytes);
    }

    /// A manual fan spins to its new target at once
    fn fan_side_effects(&mut self, key: SmcKey, bytes: &[u8]) {
        let raw = key.as_bytes();
        if raw[0] != b'F' || !raw[1].is_ascii_digit() || &raw[2..] != b"Tg" {
            return;
        }
        let index = raw[1] - b'0';
        let manual = SmcKey::fan(index, FanKey::Mode)
            .ok()
            .and_then(|k| self.keys.get(&k))
            .map(|md| md.value.first().copied().unwrap_or(0) != 0)
            .unwrap_or(false);
        if !manual {
            return;
        }
        if let Some(actual) = SmcKey::fan(index, FanKey::Actual)
            .ok()
            .and_then(|k| self.keys.get_mut(&k))
        {
            actual.value = bytes.to_vec();
        }
    }
}

/// Simulated SMC behind the port interface
///
/// Clones share one device, so a test can keep a clone to inspect writes
/// while the driver owns another.
#[derive(Debug, Clone, Default)]
pub struct SimulatedSmc {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedSmc {
    /// An SMC with no keys
    pub fn new() -> Self {
        Self::default()
    }

    /// Unpopulated port range: every read returns `0xFF`
    pub fn absent() -> Self {
        let sim = Self::new();
        sim.state().absent = true;
        sim
    }

    /// A populated machine: identification key, four fans, a set of sensors
    /// (one of them disconnected) and a read-only limit key
    pub fn demo() -> Self {
        let sim = Self::new();
        let fixed: [(&str, &str, &[u8]); 2] = [
            ("REV ", "{rev", &[0x01, 0x30, 0x0F, 0x00, 0x00, 0x03]),
            ("FNum", "ui8 ", &[4]),
        ];
        for (key, data_type, value) in fixed {
            if let Ok(key) = SmcKey::new(key) {
                sim.insert_read_only(key, data_type, value);
            }
        }

        // (min, max, actual)
        let fans: [(u16, u16, u16); 4] = [
            (600, 2900, 800),
            (600, 2800, 900),
            (500, 2800, 700),
            (500, 2800, 650),
        ];
        for (index, (min, max, actual)) in (0u8..).zip(fans) {
            let registers = [
                (FanKey::Actual, encode_rpm(actual), false),
                (FanKey::Minimum, encode_rpm(min), false),
                (FanKey::Maximum, encode_rpm(max), true),
                (FanKey::Target, encode_rpm(actual), false),
            ];
            for (register, value, read_only) in registers {
                if let Ok(key) = SmcKey::fan(index, register) {
                    sim.insert(key, "fpe2", &value, read_only);
                }
            }
            if let Ok(key) = SmcKey::fan(index, FanKey::Mode) {
                sim.insert_key(key, "ui8 ", &[0]);
            }
        }

        let sensors = [
            ("TA0P", 225),
            ("TC0D", 475),
            ("TC0P", 450),
            ("TG0D", 520),
            ("TH1P", -1280),
            ("TM0P", 380),
            ("TN0D", 510),
            ("Tp0C", 410),
        ];
        for (key, decidegrees) in sensors {
            if let Ok(key) = SmcKey::new(key) {
                sim.insert_key(key, "sp78", &sp78(decidegrees));
            }
        }
        sim
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        // A panicking test thread must not hide the device from the others
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add or replace a writable key
    pub fn insert_key(&self, key: SmcKey, data_type: &str, value: &[u8]) {
        self.insert(key, data_type, value, false);
    }

    /// Add or replace a read-only key
    pub fn insert_read_only(&self, key: SmcKey, data_type: &str, value: &[u8]) {
        self.insert(key, data_type, value, true);
    }

    fn insert(&self, key: SmcKey, data_type: &str, value: &[u8], read_only: bool) {
        let mut tag = [b' '; 4];
        for (slot, byte) in tag.iter_mut().zip(data_type.bytes()) {
            *slot = byte;
        }
        let value = value[..value.len().min(MAX_DATA_LENGTH)].to_vec();
        self.state().keys.insert(
            key,
            SimKey {
                data_type: tag,
                value,
                read_only,
            },
        );
    }

    /// Replace the value of an existing key without recording a write
    pub fn set_value(&self, key: SmcKey, value: &[u8]) {
        if let Some(entry) = self.state().keys.get_mut(&key) {
            entry.value = value.to_vec();
        }
    }

    /// Set a temperature key to `decidegrees`
    pub fn set_temperature(&self, key: SmcKey, decidegrees: i16) {
        self.set_value(key, &sp78(decidegrees));
    }

    /// Fail every command addressing `key` with `code`
    pub fn inject_fault(&self, key: SmcKey, code: u8) {
        debug!("Simulated fault on {}: 0x{:02X}", key, code);
        self.state().faults.insert(key, code);
    }

    pub fn clear_fault(&self, key: SmcKey) {
        self.state().faults.remove(&key);
    }

    /// Leave the busy bit set once a sequence on `key` has moved its data
    pub fn stall_completion(&self, key: SmcKey) {
        debug!("Simulated completion stall on {}", key);
        self.state().stalled.insert(key);
    }

    /// Stop acknowledging commands
    pub fn set_unresponsive(&self, unresponsive: bool) {
        self.state().unresponsive = unresponsive;
    }

    /// Current value of `key`
    pub fn value(&self, key: SmcKey) -> Option<Vec<u8>> {
        self.state().keys.get(&key).map(|k| k.value.clone())
    }

    /// Every successful write, in order
    pub fn writes(&self) -> Vec<(SmcKey, Vec<u8>)> {
        self.state().writes.clone()
    }

    /// Number of port reads and writes seen
    pub fn port_accesses(&self) -> usize {
        self.state().accesses
    }
}

impl PortIo for SimulatedSmc {
    fn read_byte(&mut self, port: u16) -> u8 {
        let mut state = self.state();
        state.accesses += 1;
        if state.absent {
            return STATUS_ABSENT;
        }
        match port {
            CMD_PORT => state.status,
            ERR_PORT => state.error,
            DATA_PORT => state.data_out(),
            _ => STATUS_ABSENT,
        }
    }

    fn write_byte(&mut self, port: u16, value: u8) {
        let mut state = self.state();
        state.accesses += 1;
        if state.absent {
            return;
        }
        match port {
            CMD_PORT => state.command(value),
            DATA_PORT => state.data_in(value),
            _ => {}
        }
    }
}

/// Encode decidegrees as `sp78`
pub fn sp78(decidegrees: i16) -> [u8; 2] {
    let raw = (decidegrees as i32 * 256 / 10).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
    raw.to_be_bytes()
}
