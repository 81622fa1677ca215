//! smcfan-hardware
//!
//! Hardware access crate: the port I/O capability, the SMC protocol driver,
//! a simulated SMC, and the fan control and sensor layers built on top. The
//! CLI crate uses it to talk to the controller.
//!
//! Public API:
//! - `smc_driver::SmcDriver` - protocol state machine over a `PortIo`
//! - `smc_driver::SmcTransport` - key-level seam used by everything above it
//! - `fan_control::FanController` - fan discovery, modes and the failsafe
//! - `sensors::SensorReader` - temperature discovery and refresh
//! - `simulator::SimulatedSmc` - device model for tests and dry runs

pub mod fan_control;
pub mod port_io;
pub mod sensors;
pub mod simulator;
pub mod smc_driver;
pub mod timer;

#[cfg(test)]
pub(crate) mod test_utils;

pub use fan_control::{FailsafeGuard, FanController};
#[cfg(unix)]
pub use port_io::DevPort;
pub use port_io::PortIo;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use port_io::RawPortIo;
pub use sensors::SensorReader;
pub use simulator::SimulatedSmc;
pub use smc_driver::{Session, SmcDriver, SmcHandle, SmcTransport};
pub use timer::{StdTimer, Timer, VirtualTimer};
