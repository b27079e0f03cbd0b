//! Sampling core for WeatherGuard
//!
//! Turns raw environmental sensor samples into publishable readings:
//! fault detection with reset-and-retry, fixed-offset calibration,
//! sea-level pressure derivation and wall-clock aligned publish cadence.
//!
//! Key constraints:
//! - No I/O: the register driver sits behind [`SensorReader`]
//! - No heap allocation in the sampling path
//! - Every rule here is deterministic so the loop can be replayed in tests
//!
//! ```no_run
//! use weatherguard_core::{
//!     CalibrationConfig, FaultDetector, Reading, Verdict,
//!     sensor::{SensorReader, SimulatedSensor, SensorMode},
//! };
//!
//! let mut sensor = SimulatedSensor::default();
//! sensor.init(SensorMode::Normal)?;
//!
//! let mut detector = FaultDetector::default();
//! let calibration = CalibrationConfig::new("BME280");
//!
//! let reading = Reading::from_sample(sensor.read()?, 60_000);
//! if let Verdict::Valid = detector.inspect(&reading) {
//!     let derived = weatherguard_core::calibration::derive(&reading, &calibration);
//!     assert!(derived.sea_level_pressure.is_none());
//! }
//! # Ok::<(), weatherguard_core::SensorFault>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

pub mod cadence;
pub mod calibration;
#[cfg(feature = "std")]
pub mod cancel;
pub mod constants;
pub mod detector;
pub mod errors;
pub mod reading;
pub mod sensor;
pub mod time;
pub mod traits;
pub mod validators;

// Public API
pub use cadence::PublishCadence;
pub use calibration::CalibrationConfig;
#[cfg(feature = "std")]
pub use cancel::CancellationFlag;
pub use detector::{DetectorState, FaultDetector, Verdict};
pub use errors::{SensorFault, SensorResult};
pub use reading::{DerivedReading, Reading};
pub use sensor::{RawSample, SensorMode, SensorReader};
pub use traits::{Validator, ValidatorConstraints};
pub use validators::PressureFloorValidator;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
