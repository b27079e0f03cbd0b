//! JSON state message
//!
//! One flat object per publish, keys prefixed with the configuration section
//! so several sensors on one host can share a state topic:
//!
//! ```json
//! {"BME280_humidity": 45.2, "BME280_temperature": 21.5, "BME280_pressure": 1013.25}
//! ```
//!
//! Key order is fixed (humidity, temperature, pressure, then sea level when
//! enabled).

use serde::ser::{Serialize, SerializeMap, Serializer};
use weatherguard_core::DerivedReading;

use crate::{discovery::Metric, ConnectorError};

/// State message for one derived reading
#[derive(Debug, Clone, Copy)]
pub struct StatePayload<'a> {
    section: &'a str,
    reading: &'a DerivedReading,
}

impl<'a> StatePayload<'a> {
    pub fn new(section: &'a str, reading: &'a DerivedReading) -> Self {
        Self { section, reading }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, ConnectorError> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl Serialize for StatePayload<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let sea_level = self.reading.sea_level_pressure;
        let mut map = serializer.serialize_map(Some(3 + usize::from(sea_level.is_some())))?;

        map.serialize_entry(&Metric::Humidity.field(self.section), &self.reading.humidity)?;
        map.serialize_entry(&Metric::Temperature.field(self.section), &self.reading.temperature)?;
        map.serialize_entry(&Metric::Pressure.field(self.section), &self.reading.station_pressure)?;
        if let Some(sea_level) = sea_level {
            map.serialize_entry(&Metric::SeaLevel.field(self.section), &sea_level)?;
        }

        map.end()
    }
}
