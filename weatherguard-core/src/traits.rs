//! Validation traits
//!
//! The fault detector only needs "is this value plausible". Keep the
//! interface that small; the failure modes guarded against are digital
//! (stuck or garbled registers), not statistical.

use crate::errors::SensorResult;

/// A plausibility rule for one channel
pub trait Validator {
    /// Channel value type
    type Value;

    /// `Ok` if `value` is plausible, otherwise the fault it represents
    fn validate(&self, value: Self::Value) -> SensorResult<()>;

    /// The range this rule accepts
    fn constraints(&self) -> ValidatorConstraints;
}

/// Accepted range of a [`Validator`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatorConstraints {
    /// Lowest accepted value (inclusive)
    pub min_value: f64,
    /// Highest accepted value (inclusive)
    pub max_value: f64,
}

impl ValidatorConstraints {
    /// Whether `value` lies inside the range
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min_value && value <= self.max_value
    }
}

/// Values that can be non-numbers
pub trait Validatable {
    /// `false` for NaN and infinities
    fn is_valid(&self) -> bool;
}

impl Validatable for f64 {
    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_numbers_invalid() {
        assert!(5.0f64.is_valid());
        assert!(!f64::NAN.is_valid());
        assert!(!f64::NEG_INFINITY.is_valid());
    }

    #[test]
    fn constraints_inclusive() {
        let range = ValidatorConstraints {
            min_value: 800.0,
            max_value: f64::INFINITY,
        };
        assert!(range.contains(800.0));
        assert!(!range.contains(799.9));
    }
}
