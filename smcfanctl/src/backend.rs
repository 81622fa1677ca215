//! Backend selection and SMC connection setup
//!
//! Every command talks to the SMC through one [`SmcHandle`] over a boxed port
//! and a boxed timer, so the backend is picked at runtime.

use anyhow::{bail, Context, Result};
use smcfan_core::SmcConfig;
use smcfan_hardware::{PortIo, SimulatedSmc, SmcDriver, SmcHandle, StdTimer, Timer, VirtualTimer};
use std::str::FromStr;
use tracing::{debug, info};

/// Protocol driver as used by the CLI
pub type Driver = SmcDriver<Box<dyn PortIo>, Box<dyn Timer>>;

/// Shared handle to the connected driver
pub type Handle = SmcHandle<Driver>;

/// How port bytes reach the SMC
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// Linux `/dev/port` (needs root)
    DevPort,
    /// x86 `in`/`out` instructions after `ioperm` (Linux, needs root)
    Raw,
    /// In-process simulated SMC with a demo machine
    Simulated,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::DevPort => "dev-port",
            Backend::Raw => "raw",
            Backend::Simulated => "simulated",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dev-port" => Ok(Backend::DevPort),
            "raw" => Ok(Backend::Raw),
            "simulated" => Ok(Backend::Simulated),
            _ => bail!(
                "Invalid backend '{}'. Must be 'dev-port', 'raw' or 'simulated'",
                s
            ),
        }
    }
}

#[cfg(unix)]
fn open_dev_port() -> Result<Box<dyn PortIo>> {
    let port = smcfan_hardware::DevPort::open()
        .context("Cannot open /dev/port (are you root?)")?;
    Ok(Box::new(port))
}

#[cfg(not(unix))]
fn open_dev_port() -> Result<Box<dyn PortIo>> {
    bail!("the dev-port backend needs a Unix /dev/port device")
}

#[cfg(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64")))]
fn open_raw_port() -> Result<Box<dyn PortIo>> {
    use smcfan_core::smc::{DATA_PORT, ERR_PORT};

    smcfan_hardware::port_io::request_port_access(DATA_PORT, ERR_PORT - DATA_PORT + 1)
        .context("ioperm failed (are you root?)")?;
    // SAFETY: ioperm above granted this process the SMC port range
    let port = unsafe { smcfan_hardware::RawPortIo::new() };
    Ok(Box::new(port))
}

#[cfg(not(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64"))))]
fn open_raw_port() -> Result<Box<dyn PortIo>> {
    bail!("the raw backend is only available on x86 Linux")
}

/// Build a driver for `backend` without touching the SMC yet
pub fn open(backend: Backend, config: &SmcConfig) -> Result<Driver> {
    let (port, timer): (Box<dyn PortIo>, Box<dyn Timer>) = match backend {
        Backend::DevPort => (open_dev_port()?, Box::new(StdTimer::new())),
        Backend::Raw => (open_raw_port()?, Box::new(StdTimer::new())),
        // Simulated waits only advance virtual time
        Backend::Simulated => (Box::new(SimulatedSmc::demo()), Box::new(VirtualTimer::new())),
    };

    let timing = config.timing.timing();
    debug!(
        "Backend {}: timeout {:?}, poll {:?}, io delay {:?}",
        backend, timing.timeout, timing.poll_interval, timing.io_delay
    );
    Ok(SmcDriver::with_timing(port, timer, timing))
}

/// Open `backend`, initialize the SMC and make sure it answers
///
/// Fails before any fan is touched when the SMC is not detected.
pub fn connect(backend: Backend, config: &SmcConfig) -> Result<Handle> {
    let mut driver = open(backend, config)?;

    driver
        .initialize()
        .context("SMC initialization failed")?;
    if !driver.detect() {
        bail!("SMC not detected (backend: {})", backend);
    }

    info!("Connected to SMC via {}", backend);
    Ok(SmcHandle::new(driver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use smcfan_core::SmcKey;
    use smcfan_hardware::SmcTransport;

    #[test]
    fn test_backend_names_round_trip() {
        for backend in [Backend::DevPort, Backend::Raw, Backend::Simulated] {
            assert_eq!(Backend::from_str(backend.as_str()).unwrap(), backend);
        }
        assert!(Backend::from_str("usb").is_err());
    }

    #[test]
    fn test_connect_simulated() {
        let mut handle = connect(Backend::Simulated, &SmcConfig::default()).unwrap();
        let revision = handle.read_key(SmcKey::new("REV ").unwrap()).unwrap();
        assert_eq!(revision.len(), 6);
    }
}
