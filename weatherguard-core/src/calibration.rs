//! Calibration and sea-level pressure
//!
//! ## Offsets
//!
//! Each channel gets a fixed additive offset taken from configuration. The
//! typical use is correcting self-heating: a BME280 on a Raspberry Pi HAT
//! reads a degree or two warm.
//!
//! ## Sea-level pressure
//!
//! Station pressure is what the sensor measures; forecasts and weather maps
//! use pressure reduced to sea level. The reduction used here is linear:
//!
//! ```text
//! sea_level = station + elevation_m / 9.2
//! ```
//!
//! Good to a fraction of a hPa for a few hundred meters of elevation. The
//! exponential barometric formula would be more accurate at altitude, but
//! consumers already trend on this exact output, so it stays.
//!
//! ## Precision
//!
//! Values are rounded after all arithmetic: temperature and humidity to one
//! decimal, pressures to two. Rounding works on the exact binary value and
//! exact ties go to the even digit, so `20.25` becomes `20.2` and `1013.125`
//! becomes `1013.12`. Downstream consumers already trend on that output.

use alloc::string::String;
use core::fmt::{self, Write};

use crate::{
    constants::{
        physics::SEA_LEVEL_DIVISOR_M_PER_HPA,
        sensors::{ELEVATION_DISABLED_M, HUMIDITY_DECIMALS, PRESSURE_DECIMALS, TEMPERATURE_DECIMALS},
    },
    reading::{DerivedReading, Reading},
};

/// Calibration settings, immutable after load
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationConfig {
    /// Added to temperature (°C)
    pub temperature_offset: f64,
    /// Added to relative humidity (%RH)
    pub humidity_offset: f64,
    /// Added to station pressure (hPa)
    pub pressure_offset: f64,
    /// Station elevation (m); [`ELEVATION_DISABLED_M`] turns sea-level correction off
    pub elevation_m: f64,
    /// Prefix for payload keys, e.g. `BME280` gives `BME280_temperature`
    pub section: String,
}

impl CalibrationConfig {
    /// No offsets, no sea-level correction
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            temperature_offset: 0.0,
            humidity_offset: 0.0,
            pressure_offset: 0.0,
            elevation_m: ELEVATION_DISABLED_M,
            section: section.into(),
        }
    }

    /// Set the temperature, humidity and pressure offsets
    pub fn with_offsets(mut self, temperature: f64, humidity: f64, pressure: f64) -> Self {
        self.temperature_offset = temperature;
        self.humidity_offset = humidity;
        self.pressure_offset = pressure;
        self
    }

    /// Set the station elevation in metres
    pub fn with_elevation(mut self, elevation_m: f64) -> Self {
        self.elevation_m = elevation_m;
        self
    }

    /// Sea-level pressure is derived only above the disabled sentinel
    pub fn sea_level_enabled(&self) -> bool {
        self.elevation_m > ELEVATION_DISABLED_M
    }
}

/// Calibrate a reading
///
/// Pure: same inputs, same output. Must not be called with a reading the
/// fault detector rejected.
pub fn derive(reading: &Reading, config: &CalibrationConfig) -> DerivedReading {
    let temperature = reading.temperature + config.temperature_offset;
    let humidity = reading.humidity + config.humidity_offset;
    let station = reading.pressure + config.pressure_offset;

    let sea_level = config
        .sea_level_enabled()
        .then(|| round_to(station + config.elevation_m / SEA_LEVEL_DIVISOR_M_PER_HPA, PRESSURE_DECIMALS));

    DerivedReading {
        humidity: round_to(humidity, HUMIDITY_DECIMALS),
        temperature: round_to(temperature, TEMPERATURE_DECIMALS),
        station_pressure: round_to(station, PRESSURE_DECIMALS),
        sea_level_pressure: sea_level,
    }
}

/// Above this magnitude every `f64` is already a whole number
const INTEGRAL_ABOVE: f64 = 4_503_599_627_370_496.0; // 2^52

/// Round to `decimals` places, ties to even
///
/// Goes through the formatter, which rounds the exact decimal expansion of
/// `value`; scaling by a power of ten first would round an already inexact
/// product. The digits are written to a stack buffer.
fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() || libm::fabs(value) >= INTEGRAL_ABOVE {
        return value;
    }

    let mut digits = DigitBuffer::default();
    if write!(digits, "{:.*}", decimals as usize, value).is_err() {
        return value;
    }
    digits.as_str().parse().unwrap_or(value)
}

/// Fixed-capacity sink for formatted digits
struct DigitBuffer {
    bytes: [u8; 40],
    len: usize,
}

impl Default for DigitBuffer {
    fn default() -> Self {
        Self {
            bytes: [0; 40],
            len: 0,
        }
    }
}

impl DigitBuffer {
    fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes[..self.len]).unwrap_or("")
    }
}

impl Write for DigitBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        if end > self.bytes.len() {
            return Err(fmt::Error);
        }
        self.bytes[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_offsets_pass_through() {
        let config = CalibrationConfig::new("X");
        let derived = derive(&Reading::new(20.0, 50.0, 1013.0, 0), &config);

        assert_eq!(derived.temperature, 20.0);
        assert_eq!(derived.humidity, 50.0);
        assert_eq!(derived.station_pressure, 1013.0);
        assert_eq!(derived.sea_level_pressure, None);
    }

    #[test]
    fn sea_level_from_elevation() {
        let config = CalibrationConfig::new("X").with_elevation(92.0);
        let derived = derive(&Reading::new(20.0, 50.0, 1013.0, 0), &config);

        assert_eq!(derived.sea_level_pressure, Some(1023.0));
    }

    #[test]
    fn offsets_applied_before_rounding() {
        let config = CalibrationConfig::new("X").with_offsets(-1.26, 2.04, 0.556);
        let derived = derive(&Reading::new(22.0, 40.0, 1000.0, 0), &config);

        assert_eq!(derived.temperature, 20.7);
        assert_eq!(derived.humidity, 42.0);
        assert_eq!(derived.station_pressure, 1000.56);
    }

    #[test]
    fn sea_level_uses_offset_station_pressure() {
        let config = CalibrationConfig::new("X")
            .with_offsets(0.0, 0.0, 1.5)
            .with_elevation(46.0);
        let derived = derive(&Reading::new(20.0, 50.0, 1000.0, 0), &config);

        assert_eq!(derived.station_pressure, 1001.5);
        assert_eq!(derived.sea_level_pressure, Some(1006.5));
    }

    #[test]
    fn exact_ties_round_to_even() {
        let config = CalibrationConfig::new("X");
        let derived = derive(&Reading::new(20.25, 45.25, 1013.125, 0), &config);

        assert_eq!(derived.temperature, 20.2);
        assert_eq!(derived.humidity, 45.2);
        assert_eq!(derived.station_pressure, 1013.12);

        let derived = derive(&Reading::new(20.35, 45.75, 1013.375, 0), &config);
        // 20.35 is stored just above the tie
        assert_eq!(derived.temperature, 20.4);
        assert_eq!(derived.humidity, 45.8);
        assert_eq!(derived.station_pressure, 1013.38);
    }

    #[test]
    fn rounding_edges() {
        assert_eq!(round_to(-0.25, 1), -0.2);
        assert_eq!(round_to(0.0, 2), 0.0);
        assert_eq!(round_to(1e17, 2), 1e17);
        assert!(round_to(f64::NAN, 1).is_nan());
        assert_eq!(round_to(f64::INFINITY, 1), f64::INFINITY);
    }

    #[test]
    fn sentinel_boundary() {
        assert!(!CalibrationConfig::new("X").sea_level_enabled());
        assert!(!CalibrationConfig::new("X").with_elevation(-999.0).sea_level_enabled());
        assert!(CalibrationConfig::new("X").with_elevation(-998.9).sea_level_enabled());
        // Below sea level is a real elevation (Dead Sea shore)
        assert!(CalibrationConfig::new("X").with_elevation(-430.0).sea_level_enabled());
    }
}
