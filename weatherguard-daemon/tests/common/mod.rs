//! Shared harness for daemon integration tests

#![allow(dead_code)]

use std::sync::Arc;

use weatherguard_connectors::{memory::MemoryConnector, ConnectionState, SensorContext};
use weatherguard_core::{sensor::ScriptedSensor, CalibrationConfig, SensorMode};
use weatherguard_daemon::TelemetryLoop;

pub const SECTION: &str = "X";
pub const HOST: &str = "pi4";
pub const STATE_TOPIC: &str = "homeassistant/sensor/pi4/state";
pub const STATUS_TOPIC: &str = "homeassistant/sensor/pi4/status";

/// One minute in milliseconds
pub const MINUTE_MS: u64 = 60_000;

pub type TestLoop = TelemetryLoop<ScriptedSensor, MemoryConnector>;

/// Connected in-memory bus plus the context for `calibration`
pub fn connected_bus(calibration: &CalibrationConfig) -> (MemoryConnector, Arc<SensorContext>) {
    let bus = MemoryConnector::new();
    bus.set_state(ConnectionState::Connected);
    let context = Arc::new(SensorContext::new("homeassistant", HOST, calibration));
    (bus, context)
}

/// Started loop over a scripted sensor
pub fn scripted_loop(
    sensor: ScriptedSensor,
    calibration: CalibrationConfig,
) -> (TestLoop, MemoryConnector) {
    let (bus, context) = connected_bus(&calibration);
    let mut telemetry = TelemetryLoop::new(sensor, bus.clone(), context, calibration, SensorMode::Normal);
    telemetry.start().expect("scripted sensor init");
    (telemetry, bus)
}

/// State payloads published so far, as text
pub fn state_payloads(bus: &MemoryConnector) -> Vec<String> {
    bus.messages_on(STATE_TOPIC).iter().map(|m| m.text()).collect()
}
