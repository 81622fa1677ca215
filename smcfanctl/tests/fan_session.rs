//! Fan sessions against the simulated SMC
//!
//! The control loops run on a tokio runtime with the driver on a virtual
//! timer; the simulator records every key write, which is what these tests
//! inspect.

use std::time::Duration;

use smcfan_core::codec::encode_rpm;
use smcfan_core::{FanKey, SensorCatalog, SmcConfig, SmcKey};
use smcfan_hardware::{
    FanController, SensorReader, SimulatedSmc, SmcDriver, SmcHandle, VirtualTimer,
};
use smcfanctl::backend::{connect, Backend};
use smcfanctl::cli::{
    follow_sensor, handle_info, handle_key, handle_restore, handle_sensors, handle_status,
    hold_manual, FollowSettings, KeyCommands, OutputFormat,
};

type SimHandle = SmcHandle<SmcDriver<SimulatedSmc, VirtualTimer>>;

fn fan_key(index: u8, register: FanKey) -> SmcKey {
    SmcKey::fan(index, register).unwrap()
}

fn demo() -> (SimulatedSmc, SimHandle) {
    let sim = SimulatedSmc::demo();
    let driver = SmcDriver::new(sim.clone(), VirtualTimer::new());
    (sim, SmcHandle::new(driver))
}

fn settings(sensor: &str, iterations: u64) -> FollowSettings {
    FollowSettings {
        fan_id: 2,
        sensor: SmcKey::new(sensor).unwrap(),
        min_temp: 400,
        max_temp: 800,
        interval: Duration::from_millis(1),
        iterations: Some(iterations),
    }
}

fn targets_written(sim: &SimulatedSmc, index: u8) -> Vec<Vec<u8>> {
    let target = fan_key(index, FanKey::Target);
    sim.writes()
        .into_iter()
        .filter(|(key, _)| *key == target)
        .map(|(_, value)| value)
        .collect()
}

#[tokio::test]
async fn test_hold_manual_clamps_and_restores() {
    let (sim, handle) = demo();
    let mut fans = FanController::new(handle);
    fans.discover().unwrap();

    let applied = hold_manual(&mut fans, 1, 6000, Some(Duration::from_millis(5)))
        .await
        .unwrap();

    assert_eq!(applied, 2800);
    assert_eq!(targets_written(&sim, 1), vec![encode_rpm(2800).to_vec()]);
    for index in 0..4 {
        assert_eq!(sim.value(fan_key(index, FanKey::Mode)), Some(vec![0]));
    }
}

#[tokio::test]
async fn test_follow_sensor_runs_requested_iterations() {
    let (sim, handle) = demo();
    let mut fans = FanController::new(handle.clone());
    let mut reader = SensorReader::new(handle, SensorCatalog::builtin());
    fans.discover().unwrap();

    let steps = follow_sensor(&mut fans, &mut reader, &settings("TC0P", 3), &OutputFormat::Json)
        .await
        .unwrap();

    assert_eq!(steps, 3);
    let targets = targets_written(&sim, 2);
    assert_eq!(targets.len(), 3);
    // TC0P sits inside the interval, so the target is strictly inside the range
    let rpm = u16::from_be_bytes([targets[0][0], targets[0][1]]) >> 2;
    assert!(rpm > 500 && rpm < 2800, "unexpected target {}", rpm);
    assert_eq!(sim.value(fan_key(2, FanKey::Mode)), Some(vec![0]));
}

#[tokio::test]
async fn test_follow_unreadable_sensor_runs_fan_at_max() {
    let (sim, handle) = demo();
    let mut fans = FanController::new(handle.clone());
    let mut reader = SensorReader::new(handle, SensorCatalog::builtin());
    fans.discover().unwrap();

    // TC9C does not exist on the demo machine
    let steps = follow_sensor(&mut fans, &mut reader, &settings("TC9C", 2), &OutputFormat::Table)
        .await
        .unwrap();

    assert_eq!(steps, 2);
    assert_eq!(
        targets_written(&sim, 2),
        vec![encode_rpm(2800).to_vec(), encode_rpm(2800).to_vec()]
    );
    assert_eq!(sim.value(fan_key(2, FanKey::Mode)), Some(vec![0]));
}

#[tokio::test]
async fn test_follow_recovers_when_sensor_returns() {
    let (sim, handle) = demo();
    let tc0p = SmcKey::new("TC0P").unwrap();
    sim.inject_fault(tc0p, 0x82);

    let mut fans = FanController::new(handle.clone());
    let mut reader = SensorReader::new(handle, SensorCatalog::builtin());
    fans.discover().unwrap();

    follow_sensor(&mut fans, &mut reader, &settings("TC0P", 1), &OutputFormat::Table)
        .await
        .unwrap();
    sim.clear_fault(tc0p);
    sim.set_temperature(tc0p, 400);
    follow_sensor(&mut fans, &mut reader, &settings("TC0P", 1), &OutputFormat::Table)
        .await
        .unwrap();

    assert_eq!(
        targets_written(&sim, 2),
        vec![encode_rpm(2800).to_vec(), encode_rpm(500).to_vec()]
    );
}

#[tokio::test]
async fn test_follow_on_undiscovered_fan_fails_and_restores() {
    let (sim, handle) = demo();
    let mut fans = FanController::new(handle.clone());
    let mut reader = SensorReader::new(handle, SensorCatalog::builtin());

    let result = follow_sensor(
        &mut fans,
        &mut reader,
        &settings("TC0P", 1),
        &OutputFormat::Table,
    )
    .await;

    assert!(result.is_err());
    assert!(targets_written(&sim, 2).is_empty());
    assert_eq!(sim.value(fan_key(2, FanKey::Mode)), Some(vec![0]));
}

#[test]
fn test_read_only_commands_on_simulated_backend() {
    let config = SmcConfig::default();
    let handle = connect(Backend::Simulated, &config).unwrap();

    handle_info(&handle, Backend::Simulated, &OutputFormat::Json).unwrap();
    handle_status(&handle, &config, &OutputFormat::Table).unwrap();
    handle_sensors(&handle, &config, &OutputFormat::Json).unwrap();
    handle_key(
        &handle,
        KeyCommands::Read {
            key: "F0Ac".to_string(),
        },
        &OutputFormat::Table,
    )
    .unwrap();
    handle_restore(&handle).unwrap();
}

#[test]
fn test_invalid_key_is_rejected() {
    let handle = connect(Backend::Simulated, &SmcConfig::default()).unwrap();
    let result = handle_key(
        &handle,
        KeyCommands::Info {
            key: "TOOLONG".to_string(),
        },
        &OutputFormat::Table,
    );
    assert!(result.is_err());
}
