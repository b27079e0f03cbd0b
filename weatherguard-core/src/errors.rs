//! Sensor Fault Taxonomy
//!
//! ## Design Philosophy
//!
//! Faults travel through the sampling loop on every poll, so they follow the
//! same rules as the rest of the core:
//!
//! 1. **Small Size**: Each variant carries at most two floats or one static
//!    string.
//!
//! 2. **No Heap Allocation**: Driver messages are `&'static str`, never
//!    `String`.
//!
//! 3. **Copy Semantics**: A fault can be logged, counted and returned without
//!    cloning.
//!
//! ## Fault Categories
//!
//! ### Recoverable (reset and skip)
//! - `Transport`: The bus to the device errored during a read
//! - `Implausible`: Station pressure fell below the plausibility floor
//! - `InvalidValue`: The driver produced NaN or infinity
//!
//! ### Fatal
//! - `NotInitialized`: A read was attempted before `init`
//! - `ResetFailed`: The device refused to re-enter its operating mode
//!
//! ## Handling Strategy
//!
//! ```rust
//! use weatherguard_core::SensorFault;
//!
//! fn is_recoverable(fault: SensorFault) -> bool {
//!     match fault {
//!         SensorFault::Transport { .. }
//!         | SensorFault::Implausible { .. }
//!         | SensorFault::InvalidValue => true,
//!         SensorFault::NotInitialized | SensorFault::ResetFailed { .. } => false,
//!     }
//! }
//!
//! assert!(is_recoverable(SensorFault::InvalidValue));
//! ```

use thiserror_no_std::Error;

/// Result type for sensor operations
pub type SensorResult<T> = Result<T, SensorFault>;

/// Sensor faults - kept small, they are raised on the polling path
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SensorFault {
    /// The transport to the device failed mid-read
    #[error("Sensor transport error: {reason}")]
    Transport {
        /// Driver-supplied description
        reason: &'static str,
    },

    /// Station pressure below the plausibility floor - stuck or garbled register
    #[error("Pressure {pressure_hpa} hPa below plausibility floor {floor_hpa} hPa")]
    Implausible {
        /// The raw pressure the device reported
        pressure_hpa: f64,
        /// The floor it was checked against
        floor_hpa: f64,
    },

    /// Value makes no physical sense (NaN, infinity)
    #[error("Invalid value: not a valid number")]
    InvalidValue,

    /// Read attempted before the device was put into an operating mode
    #[error("Sensor not initialized")]
    NotInitialized,

    /// Re-initialising the device failed; the loop cannot heal this
    #[error("Sensor reset failed: {reason}")]
    ResetFailed {
        /// Driver-supplied description
        reason: &'static str,
    },
}

impl SensorFault {
    /// Whether the loop may reset the device and keep polling
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::NotInitialized | Self::ResetFailed { .. })
    }
}
