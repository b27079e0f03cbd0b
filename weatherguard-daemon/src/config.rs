//! Configuration file loading
//!
//! One TOML table per sensor section; the daemon reads exactly one of them:
//!
//! ```toml
//! [BME280]
//! topic = "homeassistant"    # required, bus root
//! host = "broker.local"      # required
//! port = 1883                # required
//! address = "0x76"           # optional, integer or 0x / 0o / 0b prefixed string
//! mode = "normal"            # optional: normal, forced, sleep
//! toffset = -0.5             # optional offsets, default 0
//! hoffset = 0.0
//! poffset = 0.0
//! elevation = 92             # optional metres; -999 disables sea-level pressure
//! username = "sensor"        # optional, only used together with password
//! password = "secret"
//! ```
//!
//! Unknown keys are ignored. Any failure here is fatal before the loop starts.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use weatherguard_core::constants::sensors::{DEFAULT_SENSOR_ADDRESS, ELEVATION_DISABLED_M};
use weatherguard_core::{CalibrationConfig, SensorMode};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/weatherguard.toml";

/// Default configuration section
pub const DEFAULT_SECTION: &str = "BME280";

/// Highest 7-bit bus address
const MAX_BUS_ADDRESS: i64 = 0x7F;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("section [{0}] not found")]
    MissingSection(String),

    #[error("[{section}] missing required key `{key}`")]
    MissingKey { section: String, key: &'static str },

    #[error("[{section}] invalid `{key}`: {reason}")]
    InvalidValue {
        section: String,
        key: &'static str,
        reason: String,
    },
}

/// Bus address as written in the file
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum AddressValue {
    Int(i64),
    Text(String),
}

/// A section as written, before validation
#[derive(Debug, Default, Deserialize)]
struct RawSection {
    topic: Option<String>,
    host: Option<String>,
    port: Option<i64>,
    address: Option<AddressValue>,
    mode: Option<String>,
    toffset: Option<f64>,
    hoffset: Option<f64>,
    poffset: Option<f64>,
    elevation: Option<f64>,
    username: Option<String>,
    password: Option<String>,
}

/// Broker credentials; the password is kept out of `Debug` output
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// One validated configuration section
#[derive(Debug, Clone)]
pub struct SectionConfig {
    /// Bus root path
    pub topic: String,
    /// Broker host
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Sensor bus address
    pub address: u8,
    pub mode: SensorMode,
    /// Offsets, elevation and section name
    pub calibration: CalibrationConfig,
    pub credentials: Option<Credentials>,
}

impl SectionConfig {
    /// Read `path` and extract `section`
    pub fn load(path: &Path, section: &str) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, section)
    }

    /// Parse `section` out of a TOML document
    pub fn from_toml_str(text: &str, section: &str) -> Result<Self, ConfigError> {
        let document: toml::Table = toml::from_str(text)?;
        let value = document
            .get(section)
            .ok_or_else(|| ConfigError::MissingSection(section.to_string()))?;
        if !value.is_table() {
            return Err(ConfigError::MissingSection(section.to_string()));
        }

        let raw: RawSection = value.clone().try_into()?;
        Self::validate(raw, section)
    }

    fn validate(raw: RawSection, section: &str) -> Result<Self, ConfigError> {
        let missing = |key| ConfigError::MissingKey {
            section: section.to_string(),
            key,
        };
        let invalid = |key, reason: String| ConfigError::InvalidValue {
            section: section.to_string(),
            key,
            reason,
        };

        let topic = raw.topic.filter(|t| !t.is_empty()).ok_or_else(|| missing("topic"))?;
        let host = raw.host.filter(|h| !h.is_empty()).ok_or_else(|| missing("host"))?;
        let port = raw.port.ok_or_else(|| missing("port"))?;
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| invalid("port", format!("{port} is not a valid port")))?;

        let address = match raw.address {
            None => DEFAULT_SENSOR_ADDRESS,
            Some(AddressValue::Int(value)) => {
                check_address(value).map_err(|reason| invalid("address", reason))?
            }
            Some(AddressValue::Text(text)) => {
                parse_address(&text).map_err(|reason| invalid("address", reason))?
            }
        };

        let mode = match raw.mode {
            None => SensorMode::default(),
            Some(text) => text
                .parse()
                .map_err(|e| invalid("mode", format!("`{text}`: {e}")))?,
        };

        let elevation = raw.elevation.unwrap_or(ELEVATION_DISABLED_M);
        for (key, value) in [
            ("toffset", raw.toffset),
            ("hoffset", raw.hoffset),
            ("poffset", raw.poffset),
            ("elevation", Some(elevation)),
        ] {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(invalid(key, "must be a finite number".into()));
            }
        }

        let calibration = CalibrationConfig::new(section)
            .with_offsets(
                raw.toffset.unwrap_or(0.0),
                raw.hoffset.unwrap_or(0.0),
                raw.poffset.unwrap_or(0.0),
            )
            .with_elevation(elevation);

        let credentials = match (raw.username, raw.password) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (Some(_), None) | (None, Some(_)) => {
                log::warn!("[{section}] username and password must both be set; connecting anonymously");
                None
            }
            (None, None) => None,
        };

        Ok(Self {
            topic,
            host,
            port,
            address,
            mode,
            calibration,
            credentials,
        })
    }
}

/// Parse a bus address: decimal, or `0x` / `0o` / `0b` prefixed
pub fn parse_address(text: &str) -> Result<u8, String> {
    let trimmed = text.trim();
    let lower = trimmed.to_ascii_lowercase();

    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else {
        (lower.as_str(), 10)
    };

    let value = i64::from_str_radix(&digits.replace('_', ""), radix)
        .map_err(|_| format!("`{trimmed}` is not a number"))?;
    check_address(value)
}

fn check_address(value: i64) -> Result<u8, String> {
    if (0..=MAX_BUS_ADDRESS).contains(&value) {
        Ok(value as u8)
    } else {
        Err(format!("{value:#x} is outside the 7-bit address range"))
    }
}
