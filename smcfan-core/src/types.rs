//! Core records for fans, sensors and keys

use serde::{Deserialize, Serialize};

use crate::key::SmcKey;

/// Fan control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanMode {
    /// Firmware controls the fan (`Md = 0`)
    #[default]
    Auto,
    /// Fixed target RPM (`Md = 1`)
    Manual,
    /// Hardware manual mode, target computed from a temperature sensor
    SensorDriven,
}

impl FanMode {
    /// Value written to the `F<n>Md` key for this mode
    pub fn hardware_value(self) -> u8 {
        match self {
            FanMode::Auto => 0,
            FanMode::Manual | FanMode::SensorDriven => 1,
        }
    }

    /// Decode a hardware mode byte; anything non-zero means manual
    pub fn from_hardware(value: u8) -> Self {
        if value == 0 {
            FanMode::Auto
        } else {
            FanMode::Manual
        }
    }
}

impl std::fmt::Display for FanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FanMode::Auto => write!(f, "auto"),
            FanMode::Manual => write!(f, "manual"),
            FanMode::SensorDriven => write!(f, "sensor"),
        }
    }
}

/// Hardware-reported RPM range of one fan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanLimits {
    pub min_rpm: u16,
    pub max_rpm: u16,
}

impl FanLimits {
    pub fn new(min_rpm: u16, max_rpm: u16) -> Self {
        Self { min_rpm, max_rpm }
    }
}

/// Binds a fan to a temperature sensor and its control interval (decidegrees)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorBinding {
    pub sensor: SmcKey,
    pub min_temp: i16,
    pub max_temp: i16,
}

/// A discovered fan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanRecord {
    pub index: u8,
    pub label: String,
    pub current_rpm: u16,
    pub target_rpm: u16,
    pub limits: FanLimits,
    pub mode: FanMode,
    /// Present iff `mode` is [`FanMode::SensorDriven`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor: Option<SensorBinding>,
}

impl FanRecord {
    pub fn is_sensor_driven(&self) -> bool {
        self.sensor.is_some()
    }

    /// Set a non-sensor mode and drop any binding
    pub fn set_plain_mode(&mut self, mode: FanMode) {
        self.mode = mode;
        self.sensor = None;
    }

    /// Enter sensor-driven mode with `binding`
    pub fn bind(&mut self, binding: SensorBinding) {
        self.mode = FanMode::SensorDriven;
        self.sensor = Some(binding);
    }
}

/// A discovered temperature sensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub index: usize,
    pub key: SmcKey,
    pub label: String,
    /// Last reading in decidegrees Celsius
    pub temperature: i16,
    /// `false` whenever the most recent read failed
    pub valid: bool,
}

/// Result of a key-type query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub data_size: u8,
    /// Four-character type tag, e.g. `fpe2`, `sp78`, `ui8 `
    pub data_type: String,
    pub attributes: u8,
}
