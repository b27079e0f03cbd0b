//! Command line

use std::path::PathBuf;

use clap::Parser;

use crate::config::{DEFAULT_CONFIG_PATH, DEFAULT_SECTION};

/// Poll an environmental sensor and publish readings over MQTT with Home
/// Assistant discovery
#[derive(Debug, Clone, Parser)]
#[command(name = "weatherguard", version, about)]
pub struct Args {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Configuration file section
    #[arg(short, long, default_value = DEFAULT_SECTION)]
    pub section: String,

    /// MQTT client id [default: {host}-{pid}]
    #[arg(short = 'i', long)]
    pub client_id: Option<String>,

    /// Log every published reading at info level
    #[arg(short, long)]
    pub verbose: bool,

    /// Host identity used in topics and unique ids [default: system hostname]
    #[arg(long)]
    pub host_id: Option<String>,

    /// Log messages instead of connecting to the broker
    #[arg(long)]
    pub dry_run: bool,
}
