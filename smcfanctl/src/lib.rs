//! smcfanctl library
//!
//! Backend selection, configuration resolution, output formatting and the
//! command handlers behind the `smcfanctl` binary.
//!
//! ```no_run
//! use smcfanctl::backend::{connect, Backend};
//! use smcfan_core::SmcConfig;
//! use smcfan_hardware::FanController;
//!
//! # fn example() -> anyhow::Result<()> {
//! let handle = connect(Backend::Simulated, &SmcConfig::default())?;
//! let mut fans = FanController::new(handle);
//! for fan in fans.discover()? {
//!     println!("{}: {} RPM", fan.label, fan.current_rpm);
//! }
//! # Ok(())
//! # }
//! ```

/// Port backends and SMC connection setup.
pub mod backend;

// Internal CLI implementation - not part of public API
#[doc(hidden)]
pub mod cli;

/// Configuration types for the CLI tool.
pub mod config;

// Internal formatting functions - not part of public API
#[doc(hidden)]
pub mod format;

/// Signals that end a fan session.
pub mod shutdown;
