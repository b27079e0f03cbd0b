//! Fault detection and recovery state machine
//!
//! ## States
//!
//! ```text
//!            implausible / read error
//!   Normal ───────────────────────────▶ Faulted
//!     ▲                                    │
//!     └──────────── reset_complete ────────┘
//! ```
//!
//! On top of the two states the detector tracks the warm-up read. The device
//! may return garbage right after start-up, so the reading taken at the first
//! publish boundary is evaluated but never published, and it cannot trip the
//! fault transition. Warm-up happens once per process: after a reset the very
//! next reading is judged normally.
//!
//! The detector never touches the device. When [`FaultDetector::inspect`]
//! returns [`Verdict::Faulted`], the owner resets the sensor exactly once and
//! then calls [`FaultDetector::reset_complete`].

use crate::{
    errors::SensorFault,
    reading::Reading,
    traits::Validator,
    validators::PressureFloorValidator,
};

/// Detector state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectorState {
    /// Readings are being judged normally
    #[default]
    Normal,
    /// A fault was seen; waiting for the sensor reset to complete
    Faulted,
}

/// Outcome of inspecting one reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// Still in warm-up: usable for diagnostics, never for publishing
    WarmUp,
    /// Reading is plausible
    Valid,
    /// Reading (or the read itself) failed; reset the sensor and skip
    Faulted(SensorFault),
}

/// Classifies readings and tracks fault recovery
#[derive(Debug, Clone)]
pub struct FaultDetector {
    validator: PressureFloorValidator,
    state: DetectorState,
    warming_up: bool,
    consecutive_faults: u32,
    total_faults: u64,
}

impl Default for FaultDetector {
    fn default() -> Self {
        Self::new(PressureFloorValidator::default())
    }
}

impl FaultDetector {
    /// Detector in warm-up, judging pressure with `validator`
    pub fn new(validator: PressureFloorValidator) -> Self {
        Self {
            validator,
            state: DetectorState::Normal,
            warming_up: true,
            consecutive_faults: 0,
            total_faults: 0,
        }
    }

    /// Judge a reading
    ///
    /// During warm-up every reading comes back as [`Verdict::WarmUp`]
    /// regardless of its value.
    pub fn inspect(&mut self, reading: &Reading) -> Verdict {
        if self.warming_up {
            return Verdict::WarmUp;
        }

        match self.validator.validate(reading.pressure) {
            Ok(()) => {
                self.consecutive_faults = 0;
                Verdict::Valid
            }
            Err(fault) => self.enter_faulted(fault),
        }
    }

    /// Record a failed read (transport error)
    ///
    /// Applies during warm-up too: a read that produced nothing cannot be
    /// discarded as a warm-up sample.
    pub fn record_read_fault(&mut self, fault: SensorFault) -> Verdict {
        self.enter_faulted(fault)
    }

    /// The owner finished resetting the sensor
    pub fn reset_complete(&mut self) {
        self.state = DetectorState::Normal;
    }

    /// End warm-up at the first publish boundary
    ///
    /// Returns `true` if this call ended it, meaning the reading taken at this
    /// boundary is the discarded warm-up read.
    pub fn end_warm_up(&mut self) -> bool {
        core::mem::replace(&mut self.warming_up, false)
    }

    /// Current state
    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// `true` until the first publish boundary
    pub fn is_warming_up(&self) -> bool {
        self.warming_up
    }

    /// Faults since the last valid reading
    pub fn consecutive_faults(&self) -> u32 {
        self.consecutive_faults
    }

    /// Faults since start-up
    pub fn total_faults(&self) -> u64 {
        self.total_faults
    }

    fn enter_faulted(&mut self, fault: SensorFault) -> Verdict {
        self.state = DetectorState::Faulted;
        self.consecutive_faults = self.consecutive_faults.saturating_add(1);
        self.total_faults = self.total_faults.saturating_add(1);
        Verdict::Faulted(fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(pressure: f64) -> Reading {
        Reading::new(20.0, 50.0, pressure, 0)
    }

    fn warmed_up() -> FaultDetector {
        let mut detector = FaultDetector::default();
        assert!(detector.end_warm_up());
        detector
    }

    #[test]
    fn warm_up_reading_never_faults() {
        let mut detector = FaultDetector::default();

        assert_eq!(detector.inspect(&reading(0.0)), Verdict::WarmUp);
        assert_eq!(detector.state(), DetectorState::Normal);
        assert_eq!(detector.total_faults(), 0);
    }

    #[test]
    fn warm_up_ends_once() {
        let mut detector = FaultDetector::default();
        assert!(detector.is_warming_up());
        assert!(detector.end_warm_up());
        assert!(!detector.end_warm_up());
        assert!(!detector.is_warming_up());
    }

    #[test]
    fn low_pressure_faults() {
        let mut detector = warmed_up();

        let verdict = detector.inspect(&reading(700.0));
        assert!(matches!(verdict, Verdict::Faulted(SensorFault::Implausible { .. })));
        assert_eq!(detector.state(), DetectorState::Faulted);

        detector.reset_complete();
        assert_eq!(detector.state(), DetectorState::Normal);
        // Reset does not re-arm warm-up
        assert_eq!(detector.inspect(&reading(1010.0)), Verdict::Valid);
    }

    #[test]
    fn consecutive_faults_reset_on_valid() {
        let mut detector = warmed_up();

        detector.inspect(&reading(0.0));
        detector.reset_complete();
        detector.record_read_fault(SensorFault::Transport { reason: "nack" });
        detector.reset_complete();
        assert_eq!(detector.consecutive_faults(), 2);

        detector.inspect(&reading(1000.0));
        assert_eq!(detector.consecutive_faults(), 0);
        assert_eq!(detector.total_faults(), 2);
    }

    #[test]
    fn read_fault_during_warm_up() {
        let mut detector = FaultDetector::default();
        let verdict = detector.record_read_fault(SensorFault::Transport { reason: "nack" });

        assert!(matches!(verdict, Verdict::Faulted(_)));
        assert!(detector.is_warming_up());
    }
}
