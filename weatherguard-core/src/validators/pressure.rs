//! Station pressure plausibility
//!
//! Historical extremes for context:
//! - Lowest sea-level pressure: 870 hPa (Typhoon Tip, 1979)
//! - Highest: 1084 hPa (Siberian High, 1968)
//!
//! A ground station at a few hundred meters sits comfortably above 900 hPa.
//! The floor sits well below that so weather never trips it; only stuck or
//! garbled registers do.

use crate::{
    constants::physics::PRESSURE_FAULT_FLOOR_HPA,
    errors::SensorResult,
    traits::{Validator, ValidatorConstraints},
};

use super::utils;

/// Rejects station pressure below a fixed floor (hPa)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureFloorValidator {
    floor_hpa: f64,
}

impl Default for PressureFloorValidator {
    fn default() -> Self {
        Self {
            floor_hpa: PRESSURE_FAULT_FLOOR_HPA,
        }
    }
}

impl PressureFloorValidator {
    /// Validator with a custom floor, e.g. for a high-altitude station
    pub fn with_floor(floor_hpa: f64) -> Self {
        Self { floor_hpa }
    }

    /// Lowest accepted pressure (hPa)
    pub fn floor_hpa(&self) -> f64 {
        self.floor_hpa
    }
}

impl Validator for PressureFloorValidator {
    type Value = f64;

    fn validate(&self, value: Self::Value) -> SensorResult<()> {
        utils::check_finite(value)?;
        utils::check_range(value, &self.constraints())
    }

    fn constraints(&self) -> ValidatorConstraints {
        ValidatorConstraints {
            min_value: self.floor_hpa,
            max_value: f64::INFINITY,
        }
    }
}
