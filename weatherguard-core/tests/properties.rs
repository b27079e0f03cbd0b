//! Property tests for the sampling rules
//!
//! These pin down the behaviour downstream consumers rely on: which readings
//! count as faults, what calibration produces, and how often publishes happen.

use proptest::prelude::*;

use weatherguard_core::{
    calibration::derive,
    constants::{ELEVATION_DISABLED_M, PRESSURE_FAULT_FLOOR_HPA},
    CalibrationConfig, DetectorState, FaultDetector, PublishCadence, Reading, Verdict,
};

fn warmed_up_detector() -> FaultDetector {
    let mut detector = FaultDetector::default();
    detector.end_warm_up();
    detector
}

proptest! {
    #[test]
    fn plausible_pressure_is_valid(
        pressure in PRESSURE_FAULT_FLOOR_HPA..1100.0f64,
        temperature in -40.0..85.0f64,
        humidity in 0.0..100.0f64,
    ) {
        let mut detector = warmed_up_detector();
        let reading = Reading::new(temperature, humidity, pressure, 0);

        prop_assert_eq!(detector.inspect(&reading), Verdict::Valid);
        prop_assert_eq!(detector.state(), DetectorState::Normal);
    }

    #[test]
    fn low_pressure_is_faulted(pressure in -10.0..PRESSURE_FAULT_FLOOR_HPA) {
        let mut detector = warmed_up_detector();
        let reading = Reading::new(20.0, 50.0, pressure, 0);

        prop_assert!(matches!(detector.inspect(&reading), Verdict::Faulted(_)));
        prop_assert_eq!(detector.state(), DetectorState::Faulted);
        prop_assert_eq!(detector.total_faults(), 1);
    }

    #[test]
    fn warm_up_is_never_valid(pressure in -10.0..1100.0f64) {
        let mut detector = FaultDetector::default();
        let reading = Reading::new(20.0, 50.0, pressure, 0);

        prop_assert_eq!(detector.inspect(&reading), Verdict::WarmUp);
    }

    #[test]
    fn derive_is_pure(
        temperature in -40.0..85.0f64,
        humidity in 0.0..100.0f64,
        pressure in 800.0..1100.0f64,
        toffset in -5.0..5.0f64,
        elevation in -1500.0..3000.0f64,
    ) {
        let config = CalibrationConfig::new("X")
            .with_offsets(toffset, 0.0, 0.0)
            .with_elevation(elevation);
        let reading = Reading::new(temperature, humidity, pressure, 0);

        prop_assert_eq!(derive(&reading, &config), derive(&reading, &config));
    }

    #[test]
    fn sea_level_present_iff_enabled(elevation in -1500.0..3000.0f64) {
        let config = CalibrationConfig::new("X").with_elevation(elevation);
        let derived = derive(&Reading::new(20.0, 50.0, 1013.0, 0), &config);

        prop_assert_eq!(
            derived.sea_level_pressure.is_some(),
            elevation > ELEVATION_DISABLED_M
        );
    }

    #[test]
    fn one_publish_per_sixty_polls(start_ms in 0u64..10_000_000_000, minutes in 1u64..20) {
        let mut cadence = PublishCadence::default();
        let polls = minutes * 60;

        let due = (0..polls)
            .filter(|i| cadence.is_due(start_ms + i * 1000))
            .count() as u64;

        prop_assert_eq!(due, minutes);
    }
}
