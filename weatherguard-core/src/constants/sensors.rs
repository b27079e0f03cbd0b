//! Sensor Defaults and Output Precision
//!
//! Defaults for a BME280-class combined temperature/humidity/pressure sensor
//! on an I2C bus.

// ===== ADDRESSING =====

/// Default I2C address (SDO tied to ground).
///
/// The alternative strap (SDO to VDDIO) is 0x77.
///
/// Source: Bosch BME280 datasheet, section 6.2
pub const DEFAULT_SENSOR_ADDRESS: u8 = 0x76;

// ===== CONFIGURATION SENTINELS =====

/// Elevation value meaning "no sea-level correction" (m).
///
/// Any configured elevation strictly above this enables the sea-level field.
pub const ELEVATION_DISABLED_M: f64 = -999.0;

// ===== OUTPUT PRECISION =====

/// Decimal places published for temperature (°C).
pub const TEMPERATURE_DECIMALS: u32 = 1;

/// Decimal places published for relative humidity (%RH).
pub const HUMIDITY_DECIMALS: u32 = 1;

/// Decimal places published for station and sea-level pressure (hPa).
pub const PRESSURE_DECIMALS: u32 = 2;
