//! Sensor port - the seam between the sampling loop and the register driver
//!
//! The loop only needs three things from a device: put it into an operating
//! mode, take a sample, and put it back into that mode after a fault. Register
//! I/O, compensation formulas and bus addressing belong to the driver behind
//! [`SensorReader`].
//!
//! Two in-tree implementations exist:
//! - [`SimulatedSensor`]: plausible slowly drifting values, optional injected faults
//! - [`ScriptedSensor`]: replays a fixed list of samples and faults, records resets

use alloc::collections::VecDeque;
use core::fmt;
use core::str::FromStr;

use crate::constants::sensors::DEFAULT_SENSOR_ADDRESS;
use crate::errors::{SensorFault, SensorResult};

/// Raw channel values as returned by the driver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// °C
    pub temperature: f64,
    /// %RH
    pub humidity: f64,
    /// hPa
    pub pressure: f64,
}

impl RawSample {
    /// Sample in °C, %RH and hPa
    pub const fn new(temperature: f64, humidity: f64, pressure: f64) -> Self {
        Self {
            temperature,
            humidity,
            pressure,
        }
    }
}

/// Device operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorMode {
    /// Continuous measurement with standby between conversions
    #[default]
    Normal,
    /// One conversion per request, sleep otherwise
    Forced,
    /// No conversions
    Sleep,
}

impl SensorMode {
    /// Lowercase name, as written in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Forced => "forced",
            Self::Sleep => "sleep",
        }
    }
}

impl fmt::Display for SensorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown mode string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMode;

impl fmt::Display for UnknownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("expected one of: normal, forced, sleep")
    }
}

impl FromStr for SensorMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            m if m.eq_ignore_ascii_case("normal") => Ok(Self::Normal),
            m if m.eq_ignore_ascii_case("forced") => Ok(Self::Forced),
            m if m.eq_ignore_ascii_case("sleep") => Ok(Self::Sleep),
            _ => Err(UnknownMode),
        }
    }
}

/// Port for reading a combined temperature/humidity/pressure sensor
///
/// Implementations perform no retries of their own; retry policy belongs to
/// the fault detector and the loop that owns it.
pub trait SensorReader {
    /// Put the device into `mode`. Called once before the first read.
    fn init(&mut self, mode: SensorMode) -> SensorResult<()>;

    /// Take one sample
    fn read(&mut self) -> SensorResult<RawSample>;

    /// Re-initialise the device into the mode given to `init`.
    ///
    /// Must be safe to call repeatedly.
    fn reset(&mut self) -> SensorResult<()>;

    /// Bus address of the device, for diagnostics
    fn address(&self) -> u8 {
        DEFAULT_SENSOR_ADDRESS
    }
}

impl<S: SensorReader + ?Sized> SensorReader for alloc::boxed::Box<S> {
    fn init(&mut self, mode: SensorMode) -> SensorResult<()> {
        (**self).init(mode)
    }

    fn read(&mut self) -> SensorResult<RawSample> {
        (**self).read()
    }

    fn reset(&mut self) -> SensorResult<()> {
        (**self).reset()
    }

    fn address(&self) -> u8 {
        (**self).address()
    }
}

// ===== SIMULATED SENSOR =====

/// Simulated sensor producing plausible indoor readings
///
/// Values drift in a slow triangle wave so successive publishes differ.
/// With `with_fault_every(n)` every n-th read returns a pinned-at-zero
/// pressure, the signature of a garbled register.
#[derive(Debug, Clone)]
pub struct SimulatedSensor {
    address: u8,
    mode: Option<SensorMode>,
    reads: u64,
    fault_every: Option<u64>,
    base: RawSample,
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self {
            address: DEFAULT_SENSOR_ADDRESS,
            mode: None,
            reads: 0,
            fault_every: None,
            base: RawSample::new(21.0, 45.0, 1013.0),
        }
    }
}

impl SimulatedSensor {
    /// Simulated device at bus `address`
    pub fn new(address: u8) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    /// Inject a stuck-register fault every `n` reads (`0` disables)
    pub fn with_fault_every(mut self, n: u64) -> Self {
        self.fault_every = if n == 0 { None } else { Some(n) };
        self
    }

    /// Centre values the simulation drifts around
    pub fn with_base(mut self, base: RawSample) -> Self {
        self.base = base;
        self
    }

    /// Mode the device was last put into
    pub fn mode(&self) -> Option<SensorMode> {
        self.mode
    }

    fn drift(&self) -> f64 {
        // Triangle wave, period 600 reads, amplitude 1.0
        let phase = (self.reads % 600) as f64 / 150.0;
        if phase < 2.0 {
            phase - 1.0
        } else {
            3.0 - phase
        }
    }
}

impl SensorReader for SimulatedSensor {
    fn init(&mut self, mode: SensorMode) -> SensorResult<()> {
        self.mode = Some(mode);
        Ok(())
    }

    fn read(&mut self) -> SensorResult<RawSample> {
        if self.mode.is_none() {
            return Err(SensorFault::NotInitialized);
        }
        self.reads += 1;

        if let Some(n) = self.fault_every {
            if self.reads % n == 0 {
                return Ok(RawSample::new(self.base.temperature, self.base.humidity, 0.0));
            }
        }

        let drift = self.drift();
        Ok(RawSample::new(
            self.base.temperature + drift,
            self.base.humidity - 2.0 * drift,
            self.base.pressure + 0.5 * drift,
        ))
    }

    fn reset(&mut self) -> SensorResult<()> {
        match self.mode {
            Some(_) => Ok(()),
            None => Err(SensorFault::ResetFailed {
                reason: "reset before init",
            }),
        }
    }

    fn address(&self) -> u8 {
        self.address
    }
}

// ===== SCRIPTED SENSOR =====

/// Sensor that replays a fixed script
///
/// Each read pops the next entry. Once the script runs out the last entry
/// repeats. Counts inits, reads and resets so tests can assert on them.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSensor {
    script: VecDeque<SensorResult<RawSample>>,
    last: Option<SensorResult<RawSample>>,
    mode: Option<SensorMode>,
    fail_reset: bool,
    inits: u32,
    reads: u32,
    resets: u32,
}

impl ScriptedSensor {
    /// Sensor that plays back `script`, then repeats its last entry
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = SensorResult<RawSample>>,
    {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Script of successful samples built from pressures alone
    pub fn from_pressures<I>(pressures: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        Self::new(
            pressures
                .into_iter()
                .map(|p| Ok(RawSample::new(20.0, 50.0, p))),
        )
    }

    /// Make every `reset` fail
    pub fn failing_reset(mut self) -> Self {
        self.fail_reset = true;
        self
    }

    /// Calls to `init` so far
    pub fn inits(&self) -> u32 {
        self.inits
    }

    /// Calls to `read` so far
    pub fn reads(&self) -> u32 {
        self.reads
    }

    /// Calls to `reset` so far
    pub fn resets(&self) -> u32 {
        self.resets
    }

    /// Mode passed to the last `init`
    pub fn mode(&self) -> Option<SensorMode> {
        self.mode
    }
}

impl SensorReader for ScriptedSensor {
    fn init(&mut self, mode: SensorMode) -> SensorResult<()> {
        self.inits += 1;
        self.mode = Some(mode);
        Ok(())
    }

    fn read(&mut self) -> SensorResult<RawSample> {
        if self.mode.is_none() {
            return Err(SensorFault::NotInitialized);
        }
        self.reads += 1;

        if let Some(next) = self.script.pop_front() {
            self.last = Some(next);
        }
        self.last.unwrap_or(Err(SensorFault::Transport {
            reason: "script empty",
        }))
    }

    fn reset(&mut self) -> SensorResult<()> {
        self.resets += 1;
        if self.fail_reset {
            return Err(SensorFault::ResetFailed {
                reason: "scripted reset failure",
            });
        }
        Ok(())
    }
}
