//! Time-Related Constants
//!
//! Poll granularity, publish cadence and connection timings.

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1000;

/// Seconds per minute.
pub const SECONDS_PER_MINUTE: u64 = 60;

// ===== SAMPLING =====

/// Interval between sensor polls (milliseconds).
///
/// Sets the granularity at which publish boundaries are detected and the
/// pause taken after a sensor reset.
pub const POLL_INTERVAL_MS: u64 = 1000;

/// Publish period (seconds).
///
/// Readings go out when wall-clock seconds are a multiple of this value,
/// i.e. once per minute boundary.
pub const PUBLISH_PERIOD_S: u64 = SECONDS_PER_MINUTE;

// ===== CONNECTION =====

/// Coarse retry interval while waiting for the first bus connection (seconds).
pub const CONNECT_WAIT_RETRY_S: u64 = 10;

/// Upper bound on a single bus connection attempt (seconds).
pub const CONNECT_TIMEOUT_S: u64 = 60;

/// MQTT keep-alive interval (seconds).
pub const KEEP_ALIVE_S: u64 = 60;

/// Pause before the bus client retries after a connection error (seconds).
pub const RECONNECT_DELAY_S: u64 = 5;

// ===== FAULT REPORTING =====

/// Consecutive faults after which the loop escalates from `warn` to `error`.
///
/// One minute of back-to-back faults at the default poll interval.
pub const FAULT_ESCALATION_COUNT: u32 = 60;
