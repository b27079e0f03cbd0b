//! Physical Constants for WeatherGuard
//!
//! The fault floor and the sea-level correction are the only two pieces of
//! physics the sampling loop applies.

// ===== PLAUSIBILITY =====

/// Lowest station pressure accepted from the sensor (hPa).
///
/// Below anything a ground station records (the lowest sea-level pressure on
/// record is 870 hPa, Typhoon Tip). A BME280 with a stuck or garbled register
/// reports values pinned near zero, so a single hard floor separates digital
/// faults from weather.
pub const PRESSURE_FAULT_FLOOR_HPA: f64 = 800.0;

// ===== SEA-LEVEL CORRECTION =====

/// Meters of elevation per hPa of correction.
///
/// Linear approximation `sea_level = station + elevation / 9.2`, valid for
/// modest elevations. Published values downstream depend on this exact
/// figure, so it is not replaced with the exponential barometric formula.
///
/// Source: sandhurstweather.org.uk barometric reduction notes
pub const SEA_LEVEL_DIVISOR_M_PER_HPA: f64 = 9.2;
