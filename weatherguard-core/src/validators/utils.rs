//! Shared validation helpers

use crate::{
    errors::{SensorFault, SensorResult},
    traits::{Validatable, ValidatorConstraints},
};

/// Reject NaN and infinity
pub fn check_finite(value: f64) -> SensorResult<()> {
    if value.is_valid() {
        Ok(())
    } else {
        Err(SensorFault::InvalidValue)
    }
}

/// Reject values outside `range`
///
/// The floor is the only bound ever reported; the upper bound is open for
/// pressure.
pub fn check_range(value: f64, range: &ValidatorConstraints) -> SensorResult<()> {
    if range.contains(value) {
        Ok(())
    } else {
        Err(SensorFault::Implausible {
            pressure_hpa: value,
            floor_hpa: range.min_value,
        })
    }
}
