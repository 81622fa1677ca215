//! Test utilities for smcfan-hardware
//!
//! A key-level mock transport: keys hold plain values, failures are injected
//! per key, and every call is recorded as text.

use smcfan_core::{KeyInfo, Result, SmcError, SmcKey};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::smc_driver::SmcTransport;

#[derive(Default)]
struct MockState {
    values: HashMap<SmcKey, Vec<u8>>,
    failures: HashMap<SmcKey, SmcError>,
    written: HashMap<SmcKey, Vec<u8>>,
    calls: Vec<String>,
}

/// Mock transport for testing without port I/O
///
/// Clones share state. Reads of unset keys fail with `NotFound`; writes to any
/// key succeed unless a failure is injected.
#[derive(Clone, Default)]
pub struct MockSmc {
    state: Arc<Mutex<MockState>>,
}

impl MockSmc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: SmcKey, value: &[u8]) {
        self.state.lock().unwrap().values.insert(key, value.to_vec());
    }

    /// Fail every access to `key` with a copy of `error`
    pub fn fail(&self, key: SmcKey, error: SmcError) {
        self.state.lock().unwrap().failures.insert(key, error);
    }

    pub fn heal(&self, key: SmcKey) {
        self.state.lock().unwrap().failures.remove(&key);
    }

    /// Last value written to `key`
    pub fn written(&self, key: SmcKey) -> Option<Vec<u8>> {
        self.state.lock().unwrap().written.get(&key).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn failure(state: &MockState, key: &SmcKey) -> Option<SmcError> {
        state.failures.get(key).map(copy_error)
    }
}

fn copy_error(error: &SmcError) -> SmcError {
    match error {
        SmcError::InvalidParameter(m) => SmcError::InvalidParameter(m.clone()),
        SmcError::Timeout { step } => SmcError::Timeout { step: *step },
        SmcError::NotFound(m) => SmcError::NotFound(m.clone()),
        SmcError::WriteProtected(k) => SmcError::WriteProtected(*k),
        SmcError::Unsupported(m) => SmcError::Unsupported(m.clone()),
        SmcError::DeviceError { context, code } => SmcError::DeviceError {
            context: context.clone(),
            code: *code,
        },
        other => SmcError::device(other.to_string()),
    }
}

impl SmcTransport for MockSmc {
    fn read_key(&mut self, key: SmcKey) -> Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("read {}", key));
        if let Some(e) = Self::failure(&state, &key) {
            return Err(e);
        }
        state
            .values
            .get(&key)
            .cloned()
            .ok_or_else(|| SmcError::NotFound(format!("key {}", key)))
    }

    fn write_key(&mut self, key: SmcKey, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("write {} {:02X?}", key, data));
        if let Some(e) = Self::failure(&state, &key) {
            return Err(e);
        }
        state.values.insert(key, data.to_vec());
        state.written.insert(key, data.to_vec());
        Ok(())
    }

    fn query_key_type(&mut self, key: SmcKey) -> Result<KeyInfo> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("query {}", key));
        if let Some(e) = Self::failure(&state, &key) {
            return Err(e);
        }
        let value = state
            .values
            .get(&key)
            .ok_or_else(|| SmcError::NotFound(format!("key {}", key)))?;
        Ok(KeyInfo {
            data_size: value.len() as u8,
            data_type: "ui8 ".to_string(),
            attributes: 0xC0,
        })
    }
}
