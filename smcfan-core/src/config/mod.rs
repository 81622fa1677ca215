//! Configuration types for smcfan
//!
//! A single [`SmcConfig`] TOML file holds the protocol timing, fan fallbacks
//! and labels, extra sensor catalog entries and the control-loop interval. It
//! is read once at startup.

mod paths;
mod static_config;

pub use paths::default_config_path;
pub use static_config::{ControlConfig, FanConfig, SensorConfig, SmcConfig, TimingConfig};
