//! Temperature-to-RPM control law
//!
//! Linear interpolation between the fan limits over a temperature interval,
//! saturating at both ends. [`plan_update`] turns a sensor-driven fan record
//! and a fresh reading into the write that should follow.

use crate::codec::clamp;
use crate::key::{FanKey, SmcKey};
use crate::types::{FanLimits, FanRecord};

/// Target RPM for `temp` over `[min_temp, max_temp]` (decidegrees)
///
/// - degenerate interval (`min_temp >= max_temp`) → `min_rpm`
/// - at or below `min_temp` → `min_rpm`
/// - at or above `max_temp` → `max_rpm`
/// - otherwise linear, then clamped back into the limits
pub fn rpm_for_temp(limits: FanLimits, temp: i16, min_temp: i16, max_temp: i16) -> u16 {
    let FanLimits { min_rpm, max_rpm } = limits;

    if min_temp >= max_temp || temp <= min_temp {
        return min_rpm;
    }
    if temp >= max_temp {
        return max_rpm;
    }

    let span_t = max_temp as i64 - min_temp as i64;
    let span_rpm = max_rpm as i64 - min_rpm as i64;
    let offset = temp as i64 - min_temp as i64;
    let rpm = min_rpm as i64 + span_rpm * offset / span_t;

    clamp(rpm, min_rpm as i64, max_rpm as i64).clamp(0, u16::MAX as i64) as u16
}

/// A target write computed by the control law
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetUpdate {
    pub index: u8,
    /// The `F<n>Tg` key to write
    pub key: SmcKey,
    pub rpm: u16,
}

/// Plan the next target of a sensor-driven fan
///
/// Returns `None` when the record is not sensor-driven.
pub fn plan_update(record: &FanRecord, temp: i16) -> Option<TargetUpdate> {
    let binding = record.sensor?;
    let key = SmcKey::fan(record.index, FanKey::Target).ok()?;
    let rpm = rpm_for_temp(record.limits, temp, binding.min_temp, binding.max_temp);
    Some(TargetUpdate {
        index: record.index,
        key,
        rpm,
    })
}
