//! Reading types
//!
//! A [`Reading`] is what one poll produced; it is superseded by the next poll
//! and never stored. A [`DerivedReading`] is what actually leaves the device:
//! calibrated, rounded and optionally carrying sea-level pressure.

use crate::sensor::RawSample;
use crate::time::Timestamp;

#[cfg(feature = "serde")]
use serde::Serialize;

/// One sample from the sensor, stamped with the poll time
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Reading {
    /// Air temperature (°C)
    pub temperature: f64,
    /// Relative humidity (%RH)
    pub humidity: f64,
    /// Station pressure as reported by the device (hPa)
    pub pressure: f64,
    /// Poll time (ms since epoch)
    pub timestamp: Timestamp,
}

impl Reading {
    /// Reading taken at `timestamp` (ms since epoch)
    pub fn new(temperature: f64, humidity: f64, pressure: f64, timestamp: Timestamp) -> Self {
        Self {
            temperature,
            humidity,
            pressure,
            timestamp,
        }
    }

    /// Stamp a driver sample with the time it was taken
    pub fn from_sample(sample: RawSample, timestamp: Timestamp) -> Self {
        Self::new(sample.temperature, sample.humidity, sample.pressure, timestamp)
    }

    /// All three channels are finite numbers
    pub fn is_finite(&self) -> bool {
        self.temperature.is_finite() && self.humidity.is_finite() && self.pressure.is_finite()
    }
}

/// Calibrated reading, rounded to publish precision
///
/// `sea_level_pressure` is `None` when sea-level correction is disabled; the
/// state payload then omits the field entirely rather than sending zero or null.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DerivedReading {
    /// Relative humidity with offset applied (%RH, 1 decimal)
    pub humidity: f64,
    /// Temperature with offset applied (°C, 1 decimal)
    pub temperature: f64,
    /// Station pressure with offset applied (hPa, 2 decimals)
    pub station_pressure: f64,
    /// Sea-level pressure (hPa, 2 decimals)
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub sea_level_pressure: Option<f64>,
}
