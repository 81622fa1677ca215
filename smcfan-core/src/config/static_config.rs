//! Static configuration loaded once at startup

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::catalog::{CatalogEntry, SensorCatalog};
use crate::error::{Result, SmcError};
use crate::smc::Timing;

/// Protocol timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Sleep between two status samples, in microseconds
    pub poll_interval_us: u64,
    /// Delay after each port byte, in microseconds
    pub io_delay_us: u64,
    /// Ceiling of one status wait, in milliseconds
    pub timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_us: Timing::DEFAULT_POLL_INTERVAL_US,
            io_delay_us: Timing::DEFAULT_IO_DELAY_US,
            timeout_ms: Timing::DEFAULT_TIMEOUT_MS,
        }
    }
}

impl TimingConfig {
    pub fn timing(&self) -> Timing {
        Timing {
            poll_interval: Duration::from_micros(self.poll_interval_us),
            io_delay: Duration::from_micros(self.io_delay_us),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

/// Fan discovery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanConfig {
    /// Minimum RPM assumed when `F<n>Mn` cannot be read
    pub fallback_min_rpm: u16,
    /// Maximum RPM assumed when `F<n>Mx` cannot be read
    pub fallback_max_rpm: u16,
    /// Display label per fan index
    pub labels: Vec<String>,
}

impl Default for FanConfig {
    fn default() -> Self {
        Self {
            fallback_min_rpm: 600,
            fallback_max_rpm: 5200,
            labels: ["PCI", "PS", "EXHAUST", "INTAKE", "BOOSTA", "BOOSTB"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl FanConfig {
    /// Label of fan `index`, `FAN<n>` past the end of the table
    pub fn label(&self, index: u8) -> String {
        self.labels
            .get(index as usize)
            .cloned()
            .unwrap_or_else(|| format!("FAN{}", index))
    }
}

/// Sensor discovery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Readings at or below this value (decidegrees) are rejected at discovery
    pub sanity_floor: i16,
    /// Machine-specific entries appended to the built-in catalog
    pub extra: Vec<CatalogEntry>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            sanity_floor: -1000,
            extra: Vec::new(),
        }
    }
}

impl SensorConfig {
    /// Built-in catalog plus the configured extras
    pub fn catalog(&self) -> SensorCatalog {
        SensorCatalog::builtin().extend(self.extra.iter().cloned())
    }
}

/// Sensor-driven control loop settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Period of the sensor-driven update loop, in milliseconds
    pub interval_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

/// Static configuration for smcfan.
///
/// Located at `~/.config/smcfan/config.toml` by default. Every section is
/// optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmcConfig {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub fans: FanConfig,
    #[serde(default)]
    pub sensors: SensorConfig,
    #[serde(default)]
    pub control: ControlConfig,
}

impl SmcConfig {
    /// Parse SmcConfig from TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize SmcConfig to TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SmcError::Serialization(e.to_string()))
    }

    /// Load from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Reject values the driver cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.timing.timeout_ms == 0 {
            return Err(SmcError::Config(
                "timing.timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.fans.fallback_min_rpm > self.fans.fallback_max_rpm {
            return Err(SmcError::Config(format!(
                "fans.fallback_min_rpm ({}) exceeds fans.fallback_max_rpm ({})",
                self.fans.fallback_min_rpm, self.fans.fallback_max_rpm
            )));
        }
        if self.control.interval_ms == 0 {
            return Err(SmcError::Config(
                "control.interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
