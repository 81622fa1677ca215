//! smcfan Core Library
//!
//! Shared types, wire constants, codecs and configuration for driving an Apple
//! System Management Controller. This crate has no hardware access; the
//! protocol driver lives in `smcfan-hardware`.

pub mod catalog;
pub mod codec;
pub mod config;
pub mod control;
pub mod error;
pub mod key;
pub mod smc;
pub mod types;

// Re-export commonly used types
pub use catalog::{CatalogEntry, SensorCatalog};
pub use codec::{clamp, decode_rpm, decode_temperature, encode_rpm, format_decidegrees};
pub use config::{
    default_config_path, ControlConfig, FanConfig, SensorConfig, SmcConfig, TimingConfig,
};
pub use control::{plan_update, rpm_for_temp, TargetUpdate};
pub use error::*;
pub use key::{FanKey, SmcKey};
pub use smc::{Command, ProtocolStep, StatusWait, Timing, MAX_DATA_LENGTH, MAX_FANS};
pub use types::*;
