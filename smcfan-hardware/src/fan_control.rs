//! Fan Controller - High-level interface for fan control
//!
//! Discovers fans, reads their speed and limits, switches them between
//! automatic, manual and sensor-driven mode, and puts every fan back under
//! firmware control on exit.

use std::ops::{Deref, DerefMut};

use smcfan_core::codec::{clamp, decode_rpm, encode_rpm};
use smcfan_core::{
    plan_update, FanConfig, FanKey, FanLimits, FanMode, FanRecord, Result, SensorBinding,
    SmcError, SmcKey, MAX_FANS,
};
use tracing::{debug, info, warn};

use crate::smc_driver::SmcTransport;

/// Fan controller interface
///
/// Generic over the transport, allowing the real protocol driver, a shared
/// [`SmcHandle`](crate::SmcHandle) or mock transports for testing.
pub struct FanController<T: SmcTransport> {
    transport: T,
    settings: FanConfig,
    fans: Vec<FanRecord>,
}

impl<T: SmcTransport> FanController<T> {
    /// Create a controller with default fallbacks and labels
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, FanConfig::default())
    }

    pub fn with_config(transport: T, settings: FanConfig) -> Self {
        Self {
            transport,
            settings,
            fans: Vec::new(),
        }
    }

    /// Fans found by the last [`discover`](Self::discover)
    pub fn records(&self) -> &[FanRecord] {
        &self.fans
    }

    pub fn record(&self, index: u8) -> Option<&FanRecord> {
        self.fans.iter().find(|f| f.index == index)
    }

    fn record_mut(&mut self, index: u8) -> Option<&mut FanRecord> {
        self.fans.iter_mut().find(|f| f.index == index)
    }

    /// Validate a fan index against the SMC fan range
    fn validate_index(index: u8) -> Result<()> {
        if index as usize >= MAX_FANS {
            return Err(SmcError::InvalidParameter(format!(
                "Fan index out of range: {} (must be 0-{})",
                index,
                MAX_FANS - 1
            )));
        }
        Ok(())
    }

    fn read_fpe2(&mut self, key: SmcKey) -> Result<u16> {
        let data = self.transport.read_key(key)?;
        if data.len() < 2 {
            return Err(SmcError::device(format!(
                "{} returned {} byte(s), expected 2",
                key,
                data.len()
            )));
        }
        Ok(decode_rpm([data[0], data[1]]))
    }

    /// Probe every fan index and record the fans that answer
    ///
    /// A fan exists iff its actual-speed key reads. Missing limits fall back
    /// to the configured range, a missing mode to automatic.
    pub fn discover(&mut self) -> Result<Vec<FanRecord>> {
        let mut found = Vec::new();

        for index in 0..MAX_FANS as u8 {
            let current_rpm = match self.read_rpm(index) {
                Ok(rpm) => rpm,
                Err(e) => {
                    debug!("Fan {} not present: {}", index, e);
                    continue;
                }
            };

            let limits = self.read_limits(index).unwrap_or_else(|e| {
                warn!(
                    "Fan {}: cannot read limits ({}), assuming {}-{} RPM",
                    index, e, self.settings.fallback_min_rpm, self.settings.fallback_max_rpm
                );
                FanLimits::new(
                    self.settings.fallback_min_rpm,
                    self.settings.fallback_max_rpm,
                )
            });

            let mode = self.get_mode(index).unwrap_or_else(|e| {
                warn!("Fan {}: cannot read mode ({}), assuming auto", index, e);
                FanMode::Auto
            });

            debug!(
                "Fan {}: {} RPM, range {}-{}, {}",
                index, current_rpm, limits.min_rpm, limits.max_rpm, mode
            );
            found.push(FanRecord {
                index,
                label: self.settings.label(index),
                current_rpm,
                target_rpm: current_rpm,
                limits,
                mode,
                sensor: None,
            });
        }

        if found.is_empty() {
            return Err(SmcError::NotFound("no fans responded".to_string()));
        }

        info!("Discovered {} fan(s)", found.len());
        self.fans = found.clone();
        Ok(found)
    }

    /// Re-read the current speed of every discovered fan
    ///
    /// Every fan is attempted; the last failure is returned.
    pub fn refresh(&mut self) -> Result<()> {
        let mut last_error = None;
        let indices: Vec<u8> = self.fans.iter().map(|f| f.index).collect();

        for index in indices {
            match self.read_rpm(index) {
                Ok(rpm) => {
                    if let Some(fan) = self.record_mut(index) {
                        fan.current_rpm = rpm;
                    }
                }
                Err(e) => {
                    warn!("Fan {}: refresh failed: {}", index, e);
                    last_error = Some(e);
                }
            }
        }

        last_error.map_or(Ok(()), Err)
    }

    /// Current speed of fan `index`
    pub fn read_rpm(&mut self, index: u8) -> Result<u16> {
        Self::validate_index(index)?;
        self.read_fpe2(SmcKey::fan(index, FanKey::Actual)?)
    }

    /// Hardware-reported speed range of fan `index`
    pub fn read_limits(&mut self, index: u8) -> Result<FanLimits> {
        Self::validate_index(index)?;
        let min_rpm = self.read_fpe2(SmcKey::fan(index, FanKey::Minimum)?)?;
        let max_rpm = self.read_fpe2(SmcKey::fan(index, FanKey::Maximum)?)?;
        Ok(FanLimits::new(min_rpm, max_rpm))
    }

    /// Hardware mode of fan `index`: `Auto` or `Manual`
    pub fn get_mode(&mut self, index: u8) -> Result<FanMode> {
        Self::validate_index(index)?;
        let key = SmcKey::fan(index, FanKey::Mode)?;
        let data = self.transport.read_key(key)?;
        let Some(&value) = data.first() else {
            return Err(SmcError::device(format!("{} returned no data", key)));
        };
        Ok(FanMode::from_hardware(value))
    }

    /// Switch fan `index` between manual and automatic
    pub fn set_manual(&mut self, index: u8, enabled: bool) -> Result<()> {
        Self::validate_index(index)?;
        let key = SmcKey::fan(index, FanKey::Mode)?;
        let mode = if enabled { FanMode::Manual } else { FanMode::Auto };
        self.transport.write_key(key, &[mode.hardware_value()])?;

        if let Some(fan) = self.record_mut(index) {
            if !enabled {
                fan.set_plain_mode(FanMode::Auto);
            } else if fan.mode == FanMode::Auto {
                fan.mode = FanMode::Manual;
            }
        }
        debug!("Fan {}: manual {}", index, enabled);
        Ok(())
    }

    /// Clamp `rpm` into the fan's current limits and write it as the target
    ///
    /// Returns the value written. The limits are re-read on every call.
    pub fn set_target_rpm(&mut self, index: u8, rpm: u16) -> Result<u16> {
        Self::validate_index(index)?;
        let limits = self.read_limits(index)?;
        let applied = clamp(rpm, limits.min_rpm, limits.max_rpm);
        if applied != rpm {
            debug!(
                "Fan {}: {} RPM clamped to {} ({}-{})",
                index, rpm, applied, limits.min_rpm, limits.max_rpm
            );
        }

        let key = SmcKey::fan(index, FanKey::Target)?;
        self.transport.write_key(key, &encode_rpm(applied))?;

        if let Some(fan) = self.record_mut(index) {
            fan.limits = limits;
            fan.target_rpm = applied;
        }
        Ok(applied)
    }

    /// Put fan `index` under sensor control over `[min_temp, max_temp]`
    /// (decidegrees)
    pub fn set_sensor_driven(
        &mut self,
        index: u8,
        sensor: SmcKey,
        min_temp: i16,
        max_temp: i16,
    ) -> Result<()> {
        Self::validate_index(index)?;
        if self.record(index).is_none() {
            return Err(SmcError::NotFound(format!("fan {} not discovered", index)));
        }
        if min_temp >= max_temp {
            warn!(
                "Fan {}: empty temperature interval {}..{}, fan will hold its minimum",
                index, min_temp, max_temp
            );
        }

        self.set_manual(index, true)?;
        if let Some(fan) = self.record_mut(index) {
            fan.bind(SensorBinding {
                sensor,
                min_temp,
                max_temp,
            });
        }
        info!(
            "Fan {}: following {} over {}..{}",
            index, sensor, min_temp, max_temp
        );
        Ok(())
    }

    /// Apply the control law for a sensor-driven fan
    ///
    /// Returns the target written, or `None` when the fan is not sensor-driven.
    pub fn update_sensor_driven(&mut self, index: u8, current_temp: i16) -> Result<Option<u16>> {
        Self::validate_index(index)?;
        let Some(update) = self.record(index).and_then(|f| plan_update(f, current_temp)) else {
            return Ok(None);
        };
        debug!(
            "Fan {}: {} decidegrees → {} RPM ({})",
            index, current_temp, update.rpm, update.key
        );
        self.set_target_rpm(update.index, update.rpm).map(Some)
    }

    /// Three-way mode transition
    ///
    /// Sensor-driven mode needs a binding, see
    /// [`set_sensor_driven`](Self::set_sensor_driven).
    pub fn set_mode(&mut self, index: u8, mode: FanMode) -> Result<()> {
        match mode {
            FanMode::Auto => self.set_manual(index, false),
            FanMode::Manual => {
                self.set_manual(index, true)?;
                if let Some(fan) = self.record_mut(index) {
                    fan.set_plain_mode(FanMode::Manual);
                }
                Ok(())
            }
            FanMode::SensorDriven => Err(SmcError::InvalidParameter(
                "sensor-driven mode needs a sensor and temperature range".to_string(),
            )),
        }
    }

    /// Return every fan index to automatic mode
    ///
    /// Never stops early. Absent fans are skipped silently; the last other
    /// failure is returned once every index has been attempted.
    pub fn restore_all_to_auto(&mut self) -> Result<()> {
        let mut last_error = None;

        for index in 0..MAX_FANS as u8 {
            let key = SmcKey::fan(index, FanKey::Mode)?;
            match self.transport.write_key(key, &[FanMode::Auto.hardware_value()]) {
                Ok(()) => {
                    if let Some(fan) = self.record_mut(index) {
                        fan.set_plain_mode(FanMode::Auto);
                    }
                }
                Err(e) if e.is_not_found() => debug!("Fan {} absent, nothing to restore", index),
                Err(e) => {
                    warn!("Fan {}: failed to restore automatic mode: {}", index, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            None => {
                info!("All fans restored to automatic mode");
                Ok(())
            }
            Some(e) => Err(e),
        }
    }

    /// Arm a guard that restores every fan to automatic mode when dropped
    pub fn failsafe(&mut self) -> FailsafeGuard<'_, T> {
        FailsafeGuard {
            controller: self,
            armed: true,
        }
    }
}

/// Restores all fans to automatic mode when it goes out of scope
///
/// Dereferences to the controller, so fans are driven through the guard while
/// it is armed. Teardown runs on normal return, `?` propagation and unwinding.
pub struct FailsafeGuard<'a, T: SmcTransport> {
    controller: &'a mut FanController<T>,
    armed: bool,
}

impl<T: SmcTransport> FailsafeGuard<'_, T> {
    /// Restore now and report the outcome instead of only logging it
    pub fn restore(mut self) -> Result<()> {
        self.armed = false;
        self.controller.restore_all_to_auto()
    }
}

impl<T: SmcTransport> Deref for FailsafeGuard<'_, T> {
    type Target = FanController<T>;

    fn deref(&self) -> &Self::Target {
        &*self.controller
    }
}

impl<T: SmcTransport> DerefMut for FailsafeGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.controller
    }
}

impl<T: SmcTransport> Drop for FailsafeGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = self.controller.restore_all_to_auto() {
            warn!("Some fans may not have been restored to auto mode: {}", e);
        }
    }
}
