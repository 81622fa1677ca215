//! End-to-end scenarios against the simulated SMC
//!
//! The full stack runs here: protocol driver over the simulated port space,
//! a virtual timer, and fan control and sensor reading on a shared handle.

use std::time::Duration;

use smcfan_core::codec::encode_rpm;
use smcfan_core::smc::error_code;
use smcfan_core::{FanKey, FanMode, Result, SensorCatalog, SmcError, SmcKey};
use smcfan_hardware::{
    FanController, SensorReader, SimulatedSmc, SmcDriver, SmcHandle, SmcTransport, VirtualTimer,
};

type SimDriver = SmcDriver<SimulatedSmc, VirtualTimer>;

fn key(text: &str) -> SmcKey {
    SmcKey::new(text).unwrap()
}

fn fan_key(index: u8, register: FanKey) -> SmcKey {
    SmcKey::fan(index, register).unwrap()
}

fn demo() -> (SimulatedSmc, SmcHandle<SimDriver>, VirtualTimer) {
    let sim = SimulatedSmc::demo();
    let timer = VirtualTimer::new();
    let driver = SmcDriver::new(sim.clone(), timer.clone());
    (sim, SmcHandle::new(driver), timer)
}

#[test]
fn test_startup_sequence() -> Result<()> {
    let (_sim, handle, _timer) = demo();

    handle.with(|smc| smc.initialize())??;
    assert!(handle.with(|smc| smc.detect())?);

    let mut fans = FanController::new(handle.clone());
    let records = fans.discover()?;
    assert_eq!(records.len(), 4);
    assert_eq!(records[2].label, "EXHAUST");
    assert_eq!(records[0].limits.max_rpm, 2900);

    let mut sensors = SensorReader::new(handle, SensorCatalog::builtin());
    let found = sensors.discover_sensors()?;
    // TH1P reads -128°C and is dropped
    assert_eq!(found.len(), 7);
    assert!(found.iter().all(|s| s.key != key("TH1P")));
    assert_eq!(found[0].key, key("TA0P"));
    Ok(())
}

#[test]
fn test_manual_target_clamped_to_max() -> Result<()> {
    let (sim, handle, _timer) = demo();
    let mut fans = FanController::new(handle);
    fans.discover()?;

    fans.set_manual(1, true)?;
    let applied = fans.set_target_rpm(1, 6000)?;

    assert_eq!(applied, 2800);
    assert_eq!(
        sim.value(fan_key(1, FanKey::Target)),
        Some(encode_rpm(2800).to_vec())
    );
    assert_eq!(fans.read_rpm(1)?, 2800);
    Ok(())
}

#[test]
fn test_read_missing_key_reports_not_found() {
    let (_sim, handle, timer) = demo();
    let mut reader = SensorReader::new(handle.clone(), SensorCatalog::builtin());

    let result = reader.read_sensor(key("TC9C"));
    assert!(matches!(result, Err(SmcError::NotFound(_))));
    assert_eq!(
        handle.with(|smc| smc.last_error()).unwrap(),
        Some(error_code::NO_SUCH_KEY)
    );
    // One full data-ready wait elapsed
    assert!(timer.elapsed() >= Duration::from_millis(100));
}

#[test]
fn test_write_to_read_only_key() {
    let (sim, mut handle, _timer) = demo();
    let mx = fan_key(0, FanKey::Maximum);

    let result = handle.write_key(mx, &encode_rpm(9000));
    assert!(matches!(result, Err(SmcError::WriteProtected(k)) if k == mx));
    assert_eq!(sim.value(mx), Some(encode_rpm(2900).to_vec()));
}

#[test]
fn test_absent_hardware_is_unsupported() {
    let sim = SimulatedSmc::absent();
    let mut driver = SmcDriver::new(sim, VirtualTimer::new());

    assert!(matches!(driver.initialize(), Err(SmcError::Unsupported(_))));
    assert!(!driver.detect());
}

#[test]
fn test_restore_continues_past_failing_fan() -> Result<()> {
    let (sim, handle, _timer) = demo();
    let mut fans = FanController::new(handle);
    fans.discover()?;
    for index in 0..4 {
        fans.set_manual(index, true)?;
    }
    sim.inject_fault(fan_key(2, FanKey::Mode), error_code::BAD_CMD);

    let result = fans.restore_all_to_auto();
    assert!(matches!(
        result,
        Err(SmcError::DeviceError {
            code: Some(error_code::BAD_CMD),
            ..
        })
    ));

    // Fans 0, 1 and 3 are back in auto; fans 4 and 5 are absent and ignored
    for index in [0u8, 1, 3] {
        assert_eq!(sim.value(fan_key(index, FanKey::Mode)), Some(vec![0]));
        assert_eq!(fans.record(index).map(|f| f.mode), Some(FanMode::Auto));
    }
    assert_eq!(sim.value(fan_key(2, FanKey::Mode)), Some(vec![1]));
    Ok(())
}

#[test]
fn test_restore_on_healthy_machine() -> Result<()> {
    let (sim, handle, _timer) = demo();
    let mut fans = FanController::new(handle);
    fans.discover()?;
    fans.set_manual(0, true)?;

    fans.restore_all_to_auto()?;
    assert_eq!(sim.value(fan_key(0, FanKey::Mode)), Some(vec![0]));
    Ok(())
}

#[test]
fn test_sensor_driven_loop_follows_temperature() -> Result<()> {
    let (sim, handle, _timer) = demo();
    let mut fans = FanController::new(handle.clone());
    let mut sensors = SensorReader::new(handle, SensorCatalog::builtin());
    fans.discover()?;

    let tc0p = key("TC0P");
    // Fan 2: 500-2800 RPM over 40.0..80.0°C
    fans.set_sensor_driven(2, tc0p, 400, 800)?;

    let mut seen = Vec::new();
    for decidegrees in [350, 600, 900] {
        sim.set_temperature(tc0p, decidegrees);
        let temp = sensors.read_sensor(tc0p)?;
        seen.push(fans.update_sensor_driven(2, temp)?);
    }

    assert_eq!(seen, vec![Some(500), Some(1650), Some(2800)]);
    assert_eq!(fans.read_rpm(2)?, 2800);
    Ok(())
}

#[test]
fn test_failsafe_guard_on_shared_handle() -> Result<()> {
    let (sim, handle, _timer) = demo();
    let mut fans = FanController::new(handle);
    fans.discover()?;

    {
        let mut guard = fans.failsafe();
        guard.set_manual(3, true)?;
        guard.set_target_rpm(3, 2000)?;
        assert_eq!(sim.value(fan_key(3, FanKey::Mode)), Some(vec![1]));
    }

    assert_eq!(sim.value(fan_key(3, FanKey::Mode)), Some(vec![0]));
    Ok(())
}

#[test]
fn test_query_key_type_through_handle() -> Result<()> {
    let (_sim, mut handle, _timer) = demo();

    let info = handle.query_key_type(fan_key(0, FanKey::Actual))?;
    assert_eq!(info.data_size, 2);
    assert_eq!(info.data_type, "fpe2");

    let info = handle.query_key_type(key("REV "))?;
    assert_eq!(info.data_size, 6);
    assert_eq!(info.attributes & 0x40, 0);
    Ok(())
}
