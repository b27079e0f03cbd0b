//! The sampling loop
//!
//! ## Overview
//!
//! One sequential loop owns the sensor. Each iteration waits for the next
//! poll tick, reads, judges the reading and publishes it if the wall clock sits
//! on a minute boundary:
//!
//! ```text
//!   tick 1 s ───▶ read ──▶ FaultDetector ──fault──▶ reset, skip
//!                               │
//!                             valid / warm-up
//!                               │
//!                      minute boundary? ──no──▶ idle
//!                               │
//!                   first boundary? ──yes──▶ discard warm-up read
//!                               │
//!                   derive ──▶ publish state (not retained)
//! ```
//!
//! [`TelemetryLoop::tick`] is one iteration without waiting so tests can
//! replay a loop against a scripted clock. [`TelemetryLoop::run`] adds the
//! poll ticker and the cancellation check. The ticker runs on a fixed period,
//! so read and publish time does not push later polls off the whole second
//! a minute boundary is detected on.
//!
//! ## Going Offline
//!
//! Tasks registered with [`TelemetryLoop::with_companion`] (the discovery
//! publisher) are stopped before the retained `offline` goes out; a reconnect
//! after that point must not put `online` back.
//!
//! ## Failure Policy
//!
//! - Read errors and implausible readings: reset the sensor once, skip the iteration
//! - Publish errors: logged and dropped; the next boundary publishes fresh data
//! - Failed `init` or `reset`: fatal, returned to the caller

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use weatherguard_connectors::{
    AsyncConnector, ConnectorError, SensorContext, StatePayload, AVAILABILITY_OFFLINE,
};
use weatherguard_core::{
    calibration::derive,
    constants::time::{CONNECT_WAIT_RETRY_S, FAULT_ESCALATION_COUNT, POLL_INTERVAL_MS},
    time::{TimeSource, Timestamp},
    CalibrationConfig, CancellationFlag, DerivedReading, FaultDetector, PublishCadence, Reading,
    SensorFault, SensorMode, SensorReader, Verdict,
};

/// Errors that end the loop
#[derive(Debug, Error)]
pub enum LoopError {
    #[error("sensor failure: {0}")]
    Sensor(#[from] SensorFault),

    #[error("bus connection closed")]
    BusClosed,
}

/// Outcome of one iteration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// Nothing to publish this poll
    Idle,
    /// First boundary reached; its reading was dropped
    WarmUpDiscarded,
    /// Reading handed to the bus
    Published(DerivedReading),
    /// Publish was refused by the bus; reading dropped
    Dropped(DerivedReading),
    /// Sensor reset after a fault
    Faulted(SensorFault),
}

/// Counters returned on clean shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    /// Polls completed
    pub iterations: u64,
    /// State payloads accepted by the bus
    pub published: u64,
    /// Faults that led to a sensor reset
    pub faults: u64,
}

/// Reader, detector, calibrator and bus tied together
pub struct TelemetryLoop<S, C> {
    sensor: S,
    bus: C,
    context: Arc<SensorContext>,
    calibration: CalibrationConfig,
    mode: SensorMode,
    detector: FaultDetector,
    cadence: PublishCadence,
    poll_interval: Duration,
    connect_retry: Duration,
    verbose: bool,
    summary: LoopSummary,
    companions: Vec<JoinHandle<()>>,
}

impl<S, C> TelemetryLoop<S, C>
where
    S: SensorReader,
    C: AsyncConnector,
{
    pub fn new(
        sensor: S,
        bus: C,
        context: Arc<SensorContext>,
        calibration: CalibrationConfig,
        mode: SensorMode,
    ) -> Self {
        Self {
            sensor,
            bus,
            context,
            calibration,
            mode,
            detector: FaultDetector::default(),
            cadence: PublishCadence::default(),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            connect_retry: Duration::from_secs(CONNECT_WAIT_RETRY_S),
            verbose: false,
            summary: LoopSummary::default(),
            companions: Vec::new(),
        }
    }

    /// Poll period; zero is treated as one millisecond
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// How often to re-check while waiting for the first connection
    pub fn with_connect_retry(mut self, retry: Duration) -> Self {
        self.connect_retry = retry;
        self
    }

    /// Task to stop before `offline` is published
    pub fn with_companion(mut self, task: JoinHandle<()>) -> Self {
        self.companions.push(task);
        self
    }

    /// Log each published reading at info instead of debug
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn detector(&self) -> &FaultDetector {
        &self.detector
    }

    pub fn summary(&self) -> LoopSummary {
        self.summary
    }

    /// Block until the bus reports `Connected`
    ///
    /// Returns `Ok(false)` if cancelled first. There is no overall timeout.
    pub async fn wait_for_connection(&self, cancel: &CancellationFlag) -> Result<bool, LoopError> {
        let mut states = self.bus.subscribe();

        loop {
            if cancel.is_cancelled() {
                return Ok(false);
            }
            if states.borrow_and_update().is_connected() {
                return Ok(true);
            }

            info!("waiting for broker connection");
            match tokio::time::timeout(self.connect_retry, states.changed()).await {
                Ok(Ok(())) | Err(_) => {}
                Ok(Err(_)) => return Err(LoopError::BusClosed),
            }
        }
    }

    /// Put the sensor into its configured mode
    pub fn start(&mut self) -> Result<(), LoopError> {
        self.sensor.init(self.mode)?;

        info!(
            "sensor started on 0x{:x}, mode: {}, toffset: {:.1} C, hoffset: {:.1} %, poffset: {:.2} hPa",
            self.sensor.address(),
            self.mode,
            self.calibration.temperature_offset,
            self.calibration.humidity_offset,
            self.calibration.pressure_offset
        );
        Ok(())
    }

    /// One iteration at wall-clock time `now`, without sleeping
    pub async fn tick(&mut self, now: Timestamp) -> Result<Tick, LoopError> {
        let reading = match self.sensor.read() {
            Ok(sample) => Reading::from_sample(sample, now),
            Err(fault) => {
                self.detector.record_read_fault(fault);
                return self.recover(fault);
            }
        };

        if let Verdict::Faulted(fault) = self.detector.inspect(&reading) {
            return self.recover(fault);
        }

        if !self.cadence.is_due(now) {
            return Ok(Tick::Idle);
        }

        if self.detector.end_warm_up() {
            debug!(
                "warm-up read discarded (pressure {:.2} hPa)",
                reading.pressure
            );
            return Ok(Tick::WarmUpDiscarded);
        }

        let derived = derive(&reading, &self.calibration);
        self.log_reading(&derived);

        match self.publish_state(&derived).await {
            Ok(()) => {
                self.summary.published += 1;
                Ok(Tick::Published(derived))
            }
            Err(e) => {
                warn!("state publish failed: {e}");
                Ok(Tick::Dropped(derived))
            }
        }
    }

    /// Poll until `cancel` is set, then publish `offline`
    pub async fn run<T>(&mut self, clock: &T, cancel: &CancellationFlag) -> Result<LoopSummary, LoopError>
    where
        T: TimeSource + ?Sized,
    {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !cancel.is_cancelled() {
            ticker.tick().await;
            self.tick(clock.now()).await?;
            self.summary.iterations += 1;
        }

        info!("sensor interrupted");
        self.shutdown().await;
        Ok(self.summary)
    }

    /// Stop companion tasks, then mark the sensor unavailable (retained `offline`)
    pub async fn shutdown(&mut self) {
        self.stop_companions().await;

        let result = self
            .bus
            .publish(
                &self.context.topics.availability,
                AVAILABILITY_OFFLINE.as_bytes(),
                true,
            )
            .await;
        if let Err(e) = result {
            warn!("could not publish offline status: {e}");
        }
    }

    /// Abort companion tasks and wait until they are gone
    pub async fn stop_companions(&mut self) {
        for task in self.companions.drain(..) {
            task.abort();
            // Cancelled or finished; either way it publishes nothing more
            let _ = task.await;
        }
    }

    fn recover(&mut self, fault: SensorFault) -> Result<Tick, LoopError> {
        self.summary.faults += 1;

        let consecutive = self.detector.consecutive_faults();
        if consecutive % FAULT_ESCALATION_COUNT == 0 {
            error!("sensor fault - reset ({fault}); {consecutive} consecutive faults");
        } else {
            warn!("sensor fault - reset ({fault})");
        }

        if let Err(e) = self.sensor.reset() {
            error!("sensor reset failed: {e}");
            return Err(e.into());
        }
        self.detector.reset_complete();

        Ok(Tick::Faulted(fault))
    }

    async fn publish_state(&self, derived: &DerivedReading) -> Result<(), ConnectorError> {
        let body = StatePayload::new(&self.context.section, derived).to_json()?;
        self.bus.publish(&self.context.topics.state, &body, false).await
    }

    fn log_reading(&self, derived: &DerivedReading) {
        let line = format!(
            "temperature: {:.1}ºC, humidity: {:.1} %RH, pressure: {:.2} hPa, sealevel: {:.2} hPa",
            derived.temperature,
            derived.humidity,
            derived.station_pressure,
            derived.sea_level_pressure.unwrap_or(derived.station_pressure)
        );
        if self.verbose {
            info!("{line}");
        } else {
            debug!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weatherguard_connectors::{memory::MemoryConnector, ConnectionState};
    use weatherguard_core::sensor::{RawSample, ScriptedSensor};

    fn telemetry(sensor: ScriptedSensor) -> (TelemetryLoop<ScriptedSensor, MemoryConnector>, MemoryConnector) {
        let calibration = CalibrationConfig::new("BME280");
        let context = Arc::new(SensorContext::new("homeassistant", "pi4", &calibration));
        let bus = MemoryConnector::new();
        bus.set_state(ConnectionState::Connected);

        let mut telemetry =
            TelemetryLoop::new(sensor, bus.clone(), context, calibration, SensorMode::Normal);
        telemetry.start().unwrap();
        (telemetry, bus)
    }

    #[tokio::test]
    async fn off_boundary_polls_are_idle() {
        let (mut telemetry, bus) = telemetry(ScriptedSensor::from_pressures([1013.0]));

        assert_eq!(telemetry.tick(61_000).await.unwrap(), Tick::Idle);
        assert_eq!(telemetry.tick(62_000).await.unwrap(), Tick::Idle);
        assert!(bus.messages().is_empty());
        assert!(telemetry.detector().is_warming_up());
    }

    #[tokio::test]
    async fn first_boundary_is_warm_up() {
        let (mut telemetry, bus) = telemetry(ScriptedSensor::from_pressures([1013.0]));

        assert_eq!(telemetry.tick(60_000).await.unwrap(), Tick::WarmUpDiscarded);
        assert!(bus.messages().is_empty());
        assert!(matches!(telemetry.tick(120_000).await.unwrap(), Tick::Published(_)));
    }

    #[tokio::test]
    async fn implausible_reading_resets_once() {
        let (mut telemetry, bus) = telemetry(ScriptedSensor::from_pressures([1013.0, 1013.0, 0.0, 1013.0]));

        telemetry.tick(60_000).await.unwrap();
        telemetry.tick(61_000).await.unwrap();
        let tick = telemetry.tick(62_000).await.unwrap();

        assert!(matches!(tick, Tick::Faulted(SensorFault::Implausible { .. })));
        assert_eq!(telemetry.sensor().resets(), 1);
        assert_eq!(telemetry.tick(63_000).await.unwrap(), Tick::Idle);
        assert_eq!(telemetry.sensor().resets(), 1);
        assert!(bus.messages().is_empty());
    }

    #[tokio::test]
    async fn read_error_takes_fault_path_even_in_warm_up() {
        let sensor = ScriptedSensor::new([
            Err(SensorFault::Transport { reason: "nack" }),
            Ok(RawSample::new(20.0, 50.0, 1013.0)),
        ]);
        let (mut telemetry, _bus) = telemetry(sensor);

        let tick = telemetry.tick(60_000).await.unwrap();
        assert_eq!(tick, Tick::Faulted(SensorFault::Transport { reason: "nack" }));
        assert_eq!(telemetry.sensor().resets(), 1);

        // Boundary not claimed by the faulted poll
        assert_eq!(telemetry.tick(60_400).await.unwrap(), Tick::WarmUpDiscarded);
    }

    #[tokio::test]
    async fn failed_reset_is_fatal() {
        let sensor = ScriptedSensor::new([Err(SensorFault::Transport { reason: "nack" })]).failing_reset();
        let (mut telemetry, _bus) = telemetry(sensor);

        let err = telemetry.tick(1_000).await.unwrap_err();
        assert!(matches!(err, LoopError::Sensor(SensorFault::ResetFailed { .. })));
    }

    #[tokio::test]
    async fn boundary_claimed_once_per_second() {
        let (mut telemetry, bus) = telemetry(ScriptedSensor::from_pressures([1013.0]));

        telemetry.tick(60_000).await.unwrap();
        assert!(matches!(telemetry.tick(119_600).await.unwrap(), Tick::Published(_)));
        assert_eq!(telemetry.tick(120_400).await.unwrap(), Tick::Idle);
        assert_eq!(bus.messages().len(), 1);
    }

    #[tokio::test]
    async fn refused_publish_is_dropped() {
        let calibration = CalibrationConfig::new("BME280");
        let context = Arc::new(SensorContext::new("homeassistant", "pi4", &calibration));
        let bus = MemoryConnector::new().strict();
        let mut telemetry = TelemetryLoop::new(
            ScriptedSensor::from_pressures([1013.0]),
            bus.clone(),
            context,
            calibration,
            SensorMode::Normal,
        );
        telemetry.start().unwrap();

        telemetry.tick(60_000).await.unwrap();
        assert!(matches!(telemetry.tick(120_000).await.unwrap(), Tick::Dropped(_)));
        assert_eq!(telemetry.summary().published, 0);
        assert_eq!(bus.stats().messages_failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_until_connected() {
        let calibration = CalibrationConfig::new("BME280");
        let context = Arc::new(SensorContext::new("homeassistant", "pi4", &calibration));
        let bus = MemoryConnector::new();
        let telemetry = TelemetryLoop::new(
            ScriptedSensor::from_pressures([1013.0]),
            bus.clone(),
            context,
            calibration,
            SensorMode::Normal,
        );

        let connector = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(25)).await;
            connector.set_state(ConnectionState::Connected);
        });

        let cancel = CancellationFlag::new();
        assert!(telemetry.wait_for_connection(&cancel).await.unwrap());
        assert!(bus.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_while_waiting() {
        let calibration = CalibrationConfig::new("BME280");
        let context = Arc::new(SensorContext::new("homeassistant", "pi4", &calibration));
        let telemetry = TelemetryLoop::new(
            ScriptedSensor::from_pressures([1013.0]),
            MemoryConnector::new(),
            context,
            calibration,
            SensorMode::Normal,
        );

        let cancel = CancellationFlag::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(15)).await;
            canceller.cancel();
        });

        assert!(!telemetry.wait_for_connection(&cancel).await.unwrap());
    }

    #[tokio::test]
    async fn shutdown_publishes_retained_offline() {
        let (mut telemetry, bus) = telemetry(ScriptedSensor::from_pressures([1013.0]));

        telemetry.shutdown().await;

        let status = bus.retained("homeassistant/sensor/pi4/status").unwrap();
        assert_eq!(status.text(), "offline");
    }
}
