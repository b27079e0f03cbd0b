//! Log output
//!
//! `RUST_LOG` filters as usual, defaulting to `info`. Every line carries a
//! UTC timestamp and the pid so faults can be matched against service-manager
//! restarts.

use std::io::Write;

use env_logger::{Builder, Env};

/// Install the global logger; fails if one is already installed
pub fn init() -> Result<(), log::SetLoggerError> {
    let pid = std::process::id();

    Builder::from_env(Env::default().default_filter_or("info"))
        .format(move |buf, record| {
            writeln!(
                buf,
                "{} pid {} {:<5} {}",
                buf.timestamp_seconds(),
                pid,
                record.level(),
                record.args()
            )
        })
        .try_init()
}
