//! WeatherGuard daemon
//!
//! Wires the sampling core to the bus:
//!
//! ```text
//!   SensorReader ──▶ TelemetryLoop ──state──▶ AsyncConnector ──▶ broker
//!                         ▲                        │
//!   CancellationFlag ─────┘       watch<ConnectionState>
//!   (SIGINT / SIGTERM / SIGHUP)                   │
//!                                                 ▼
//!                                       DiscoveryPublisher
//! ```
//!
//! - [`config`]: the TOML section this process runs from
//! - [`cli`]: command line
//! - [`host`]: host identity and default client id
//! - [`logging`]: `env_logger` setup
//! - [`telemetry`]: the sampling loop

pub mod cli;
pub mod config;
pub mod host;
pub mod logging;
pub mod telemetry;

pub use cli::Args;
pub use config::{ConfigError, Credentials, SectionConfig};
pub use telemetry::{LoopError, LoopSummary, TelemetryLoop, Tick};

/// Daemon version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
