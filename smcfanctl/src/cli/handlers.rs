//! Command execution handlers
//!
//! Every handler that takes a fan out of automatic mode does it through a
//! [`FailsafeGuard`](smcfan_hardware::FailsafeGuard), so all fans go back to
//! firmware control on a shutdown signal, on error and on normal return.

use anyhow::{bail, Context, Result};
use smcfan_core::smc::IDENT_KEY;
use smcfan_core::{FanMode, SensorRecord, SmcConfig, SmcKey};
use smcfan_hardware::{FanController, SensorReader, SmcTransport};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::backend::{Backend, Handle};
use crate::format::{
    decode_value, format_follow_step, format_success, format_warning, FollowStep, KeyValue,
    SmcInfo,
};
use crate::shutdown::shutdown_signal;

use super::commands::*;

/// Parameters of a sensor-driven run
#[derive(Debug, Clone)]
pub struct FollowSettings {
    pub fan_id: u8,
    pub sensor: SmcKey,
    /// Decidegrees
    pub min_temp: i16,
    /// Decidegrees
    pub max_temp: i16,
    pub interval: Duration,
    pub iterations: Option<u64>,
}

/// Convert a CLI temperature in °C to decidegrees
pub fn celsius_to_decidegrees(celsius: f32) -> Result<i16> {
    if !celsius.is_finite() || !(-128.0..=127.0).contains(&celsius) {
        bail!("Temperature {}°C out of range (-128 to 127)", celsius);
    }
    Ok((celsius * 10.0).round() as i16)
}

fn parse_key(text: &str) -> Result<SmcKey> {
    SmcKey::from_str(text).with_context(|| format!("Invalid SMC key '{}'", text))
}

/// Handle info command
pub fn handle_info(handle: &Handle, backend: Backend, format: &OutputFormat) -> Result<()> {
    let mut transport = handle.clone();
    let ident = parse_key(IDENT_KEY)?;

    let revision = transport.read_key(ident)?;
    let revision_type = transport
        .query_key_type(ident)
        .inspect_err(|e| warn!("Cannot query {}: {}", ident, e))
        .ok();
    let fan_count = parse_key("FNum")
        .ok()
        .and_then(|key| transport.read_key(key).ok())
        .and_then(|data| data.first().copied());

    let info = SmcInfo {
        backend: backend.to_string(),
        revision,
        revision_type,
        fan_count,
    };
    println!("{}", crate::format::format_info(&info, &format.into())?);
    Ok(())
}

/// Handle status command
pub fn handle_status(handle: &Handle, config: &SmcConfig, format: &OutputFormat) -> Result<()> {
    let mut fans = FanController::with_config(handle.clone(), config.fans.clone());
    let records = fans.discover().context("Fan discovery failed")?;

    println!(
        "{}",
        crate::format::format_fan_status(&records, &format.into())?
    );
    Ok(())
}

/// Handle sensors command
pub fn handle_sensors(handle: &Handle, config: &SmcConfig, format: &OutputFormat) -> Result<()> {
    let mut reader = SensorReader::new(handle.clone(), config.sensors.catalog())
        .with_sanity_floor(config.sensors.sanity_floor);
    let sensors = reader
        .discover_sensors()
        .context("Sensor discovery failed")?;

    println!("{}", crate::format::format_sensors(&sensors, &format.into())?);
    Ok(())
}

/// Handle key commands
pub fn handle_key(handle: &Handle, command: KeyCommands, format: &OutputFormat) -> Result<()> {
    let mut transport = handle.clone();

    match command {
        KeyCommands::Read { key } => {
            let key = parse_key(&key)?;
            let data = transport.read_key(key)?;
            let info = transport.query_key_type(key).ok();
            let decoded = info.as_ref().and_then(|i| decode_value(i, &data));

            let value = KeyValue {
                key,
                data,
                info,
                decoded,
            };
            println!(
                "{}",
                crate::format::format_key_value(&value, &format.into())?
            );
        }
        KeyCommands::Info { key } => {
            let key = parse_key(&key)?;
            let info = transport.query_key_type(key)?;
            println!(
                "{}",
                crate::format::format_key_info(key, &info, &format.into())?
            );
        }
    }

    Ok(())
}

/// Handle fan commands
pub async fn handle_fan(
    handle: &Handle,
    config: &SmcConfig,
    command: FanCommands,
    format: &OutputFormat,
) -> Result<()> {
    let mut fans = FanController::with_config(handle.clone(), config.fans.clone());

    match command {
        FanCommands::Manual {
            fan_id,
            rpm,
            hold_secs,
        } => {
            fans.discover().context("Fan discovery failed")?;
            hold_manual(&mut fans, fan_id, rpm, hold_secs.map(Duration::from_secs)).await?;
            println!(
                "{}",
                format_success("All fans restored to automatic mode")
            );
        }
        FanCommands::Follow {
            fan_id,
            sensor,
            min_temp,
            max_temp,
            interval_ms,
            iterations,
        } => {
            let settings = FollowSettings {
                fan_id,
                sensor: parse_key(&sensor)?,
                min_temp: celsius_to_decidegrees(min_temp)?,
                max_temp: celsius_to_decidegrees(max_temp)?,
                interval: Duration::from_millis(
                    interval_ms.unwrap_or(config.control.interval_ms).max(1),
                ),
                iterations,
            };
            let mut reader = SensorReader::new(handle.clone(), config.sensors.catalog());

            fans.discover().context("Fan discovery failed")?;
            let steps = follow_sensor(&mut fans, &mut reader, &settings, format).await?;
            println!(
                "{}",
                format_success(&format!(
                    "{} update(s), all fans restored to automatic mode",
                    steps
                ))
            );
        }
        FanCommands::Auto { fan_id } => {
            fans.set_mode(fan_id, FanMode::Auto)?;
            println!(
                "{}",
                format_success(&format!("Fan {} returned to automatic mode", fan_id))
            );
        }
    }

    Ok(())
}

/// Handle restore command
pub fn handle_restore(handle: &Handle) -> Result<()> {
    let mut fans = FanController::new(handle.clone());
    fans.restore_all_to_auto()
        .context("Some fans could not be restored to automatic mode")?;
    println!(
        "{}",
        format_success("All fans restored to automatic mode")
    );
    Ok(())
}

/// Run fan `fan_id` at `rpm` until a shutdown signal or until `hold`
/// elapses, then restore every fan
///
/// Returns the RPM actually applied after clamping.
pub async fn hold_manual<T: SmcTransport>(
    fans: &mut FanController<T>,
    fan_id: u8,
    rpm: u16,
    hold: Option<Duration>,
) -> Result<u16> {
    let shutdown = shutdown_signal()?;

    let mut guard = fans.failsafe();
    guard.set_manual(fan_id, true)?;
    let applied = guard.set_target_rpm(fan_id, rpm)?;

    if applied != rpm {
        println!(
            "{}",
            format_warning(&format!(
                "Requested {} RPM is outside the fan's range, using {}",
                rpm, applied
            ))
        );
    }
    println!(
        "{}",
        format_success(&format!("Fan {} held at {} RPM", fan_id, applied))
    );

    match hold {
        Some(duration) => {
            info!("Holding fan {} for {:?} (Ctrl-C to stop)", fan_id, duration);
            tokio::select! {
                _ = tokio::time::sleep(duration) => {}
                _ = shutdown => {}
            }
        }
        None => {
            info!("Holding fan {} until Ctrl-C", fan_id);
            shutdown.await;
        }
    }

    guard.restore()?;
    Ok(applied)
}

/// Drive a fan from a sensor until a shutdown signal or the iteration limit
///
/// A failed sensor read marks the sensor invalid and runs the fan at its
/// maximum until readings come back. Every fan is restored to automatic mode
/// when the loop ends, whichever way it ends. Returns the number of updates.
pub async fn follow_sensor<T: SmcTransport, R: SmcTransport>(
    fans: &mut FanController<T>,
    reader: &mut SensorReader<R>,
    settings: &FollowSettings,
    format: &OutputFormat,
) -> Result<u64> {
    let shutdown = shutdown_signal()?;

    let mut guard = fans.failsafe();
    guard.set_sensor_driven(
        settings.fan_id,
        settings.sensor,
        settings.min_temp,
        settings.max_temp,
    )?;

    let mut sensor = SensorRecord {
        index: 0,
        key: settings.sensor,
        label: reader.describe(&settings.sensor),
        temperature: 0,
        valid: false,
    };
    info!(
        "Fan {} following {} ({}) every {:?}",
        settings.fan_id, sensor.key, sensor.label, settings.interval
    );

    let mut ticker = tokio::time::interval(settings.interval);
    tokio::pin!(shutdown);
    let mut steps = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => break,
        }

        reader.refresh_sensors(std::slice::from_mut(&mut sensor));
        let target_rpm = if sensor.valid {
            match guard.update_sensor_driven(settings.fan_id, sensor.temperature)? {
                Some(rpm) => rpm,
                None => bail!("Fan {} is no longer sensor-driven", settings.fan_id),
            }
        } else {
            warn!(
                "Sensor {} unreadable, running fan {} at maximum",
                sensor.key, settings.fan_id
            );
            // Clamped to the fan's maximum
            guard.set_target_rpm(settings.fan_id, u16::MAX)?
        };

        let step = FollowStep {
            fan: settings.fan_id,
            sensor: sensor.key,
            temperature: sensor.valid.then_some(sensor.temperature),
            target_rpm,
        };
        println!("{}", format_follow_step(&step, &format.into())?);

        steps += 1;
        if settings.iterations.is_some_and(|limit| steps >= limit) {
            break;
        }
    }

    guard.restore()?;
    Ok(steps)
}

/// Generate shell completion scripts
pub fn generate_completion(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}
