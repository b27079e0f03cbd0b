//! Constants for WeatherGuard Core
//!
//! Every numeric value the sampling loop depends on lives here, with its
//! unit in the name and the reason it has the value it has.
//!
//! ## Organization
//!
//! - **Physics**: Plausibility floor and the sea-level approximation
//! - **Sensors**: Sensor defaults, sentinels and output precision
//! - **Time**: Poll interval, publish period and connection timings

/// Physical limits and the sea-level pressure approximation.
pub mod physics;

/// Sensor defaults, configuration sentinels and rounding precision.
pub mod sensors;

/// Poll, publish and connection timing.
pub mod time;

// Re-export commonly used constants for convenience
pub use physics::{PRESSURE_FAULT_FLOOR_HPA, SEA_LEVEL_DIVISOR_M_PER_HPA};

pub use sensors::{DEFAULT_SENSOR_ADDRESS, ELEVATION_DISABLED_M};

pub use time::{MS_PER_SECOND, POLL_INTERVAL_MS, PUBLISH_PERIOD_S};
