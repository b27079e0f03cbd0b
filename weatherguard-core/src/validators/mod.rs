//! Plausibility Validators
//!
//! ## Why a single floor?
//!
//! A BME280 that loses its calibration registers or gets a corrupted burst
//! read does not drift - it reports values pinned near zero or pure garbage.
//! Weather never takes station pressure below 800 hPa at a ground station,
//! so one hard floor separates digital faults from real readings without
//! any history or statistics.
//!
//! ```rust
//! use weatherguard_core::{PressureFloorValidator, Validator};
//!
//! let validator = PressureFloorValidator::default();
//! assert!(validator.validate(1013.0).is_ok());
//! assert!(validator.validate(0.0).is_err());
//! ```

mod pressure;
mod utils;

pub use pressure::PressureFloorValidator;
