//! Home Assistant MQTT discovery
//!
//! Each published metric gets a retained descriptor on its own config topic
//! telling Home Assistant how to build an entity from the shared state
//! message:
//!
//! ```json
//! {
//!   "availability_topic": "homeassistant/sensor/pi4/status",
//!   "device_class": "temperature",
//!   "device": { "identifiers": "pi4", "name": "pi4 Sensor" },
//!   "enabled_by_default": true,
//!   "name": "Temperature",
//!   "state_class": "measurement",
//!   "state_topic": "homeassistant/sensor/pi4/state",
//!   "unique_id": "pi4_temperature",
//!   "unit_of_measurement": "°C",
//!   "value_template": "{{ value_json.BME280_temperature }}"
//! }
//! ```
//!
//! Descriptors are followed by a retained `online` on the availability topic.
//! Republishing identical retained messages is invisible to subscribers, so
//! announcing on every reconnect is safe.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::watch;

use crate::{context::SensorContext, AsyncConnector, ConnectionState, ConnectorError, AVAILABILITY_ONLINE};

/// A published measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Temperature,
    Humidity,
    Pressure,
    SeaLevel,
}

impl Metric {
    /// All metrics in announce order
    pub const ALL: [Metric; 4] = [
        Metric::Temperature,
        Metric::Humidity,
        Metric::Pressure,
        Metric::SeaLevel,
    ];

    /// Entity display name
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature",
            Metric::Humidity => "Humidity",
            Metric::Pressure => "Pressure",
            Metric::SeaLevel => "Sealevel",
        }
    }

    /// Suffix used in payload keys and config topics
    pub fn key(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Pressure => "pressure",
            Metric::SeaLevel => "sealevel",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Temperature => "°C",
            Metric::Humidity => "%",
            Metric::Pressure | Metric::SeaLevel => "hPa",
        }
    }

    /// Home Assistant sensor device class
    pub fn device_class(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Pressure | Metric::SeaLevel => "pressure",
        }
    }

    /// Payload key, e.g. `BME280_temperature`
    pub fn field(&self, section: &str) -> String {
        format!("{}_{}", section, self.key())
    }

    /// Metrics announced for a context; sea-level only when it is computed
    pub fn enabled(context: &SensorContext) -> impl Iterator<Item = Metric> + '_ {
        Self::ALL
            .into_iter()
            .filter(move |metric| *metric != Metric::SeaLevel || context.sea_level_enabled)
    }
}

/// Device block shared by all entities of one host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub identifiers: String,
    pub name: String,
}

/// Discovery descriptor; field order is the wire order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryDescriptor {
    pub availability_topic: String,
    pub device_class: &'static str,
    pub device: DeviceInfo,
    pub enabled_by_default: bool,
    pub name: &'static str,
    pub state_class: &'static str,
    pub state_topic: String,
    pub unique_id: String,
    pub unit_of_measurement: &'static str,
    pub value_template: String,
}

impl DiscoveryDescriptor {
    pub fn new(metric: Metric, context: &SensorContext) -> Self {
        Self {
            availability_topic: context.topics.availability.clone(),
            device_class: metric.device_class(),
            device: DeviceInfo {
                identifiers: context.host.clone(),
                name: format!("{} Sensor", context.host),
            },
            enabled_by_default: true,
            name: metric.name(),
            state_class: "measurement",
            state_topic: context.topics.state.clone(),
            unique_id: format!("{}_{}", context.host, metric.name()).to_lowercase(),
            unit_of_measurement: metric.unit(),
            value_template: format!("{{{{ value_json.{} }}}}", metric.field(&context.section)),
        }
    }
}

/// Announces descriptors and availability whenever the bus (re)connects
#[derive(Debug, Clone)]
pub struct DiscoveryPublisher {
    context: Arc<SensorContext>,
    announcements: Vec<(String, Vec<u8>)>,
}

impl DiscoveryPublisher {
    /// Serialize every descriptor up front; they never change while running
    pub fn new(context: Arc<SensorContext>) -> Result<Self, ConnectorError> {
        let announcements = Metric::enabled(&context)
            .map(|metric| {
                let body = serde_json::to_vec(&DiscoveryDescriptor::new(metric, &context))?;
                Ok((context.topics.discovery(metric), body))
            })
            .collect::<Result<Vec<_>, ConnectorError>>()?;

        Ok(Self {
            context,
            announcements,
        })
    }

    /// Number of descriptors one announce publishes
    pub fn descriptor_count(&self) -> usize {
        self.announcements.len()
    }

    /// Publish all descriptors, then `online`, all retained
    ///
    /// Returns the number of messages published.
    pub async fn announce<C>(&self, bus: &C) -> Result<usize, ConnectorError>
    where
        C: AsyncConnector + ?Sized,
    {
        for (topic, body) in &self.announcements {
            bus.publish(topic, body, true).await?;
        }
        bus.publish(&self.context.topics.availability, AVAILABILITY_ONLINE.as_bytes(), true)
            .await?;

        Ok(self.announcements.len() + 1)
    }

    /// Re-announce on every transition into `Connected`
    ///
    /// Runs until the connector's state channel closes. Announce failures are
    /// logged; the next reconnect tries again.
    pub async fn run<C>(self, bus: &C)
    where
        C: AsyncConnector + ?Sized,
    {
        let mut states: watch::Receiver<ConnectionState> = bus.subscribe();

        loop {
            let state = *states.borrow_and_update();
            if state.is_connected() {
                match self.announce(bus).await {
                    Ok(count) => info!(
                        "announced {} discovery descriptors for {} ({} messages)",
                        self.descriptor_count(),
                        self.context.host,
                        count
                    ),
                    Err(e) => warn!("discovery announce failed: {e}"),
                }
            } else {
                debug!("bus disconnected; discovery waiting for reconnect");
            }

            if states.changed().await.is_err() {
                debug!("connection state channel closed; discovery stopping");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weatherguard_core::CalibrationConfig;

    fn context(elevation: Option<f64>) -> Arc<SensorContext> {
        let mut calibration = CalibrationConfig::new("BME280");
        if let Some(elevation) = elevation {
            calibration = calibration.with_elevation(elevation);
        }
        Arc::new(SensorContext::new("homeassistant", "Pi4", &calibration))
    }

    #[test]
    fn descriptor_wire_format() {
        let descriptor = DiscoveryDescriptor::new(Metric::Temperature, &context(None));
        let json = serde_json::to_string(&descriptor).unwrap();

        assert_eq!(
            json,
            concat!(
                r#"{"availability_topic":"homeassistant/sensor/Pi4/status","#,
                r#""device_class":"temperature","#,
                r#""device":{"identifiers":"Pi4","name":"Pi4 Sensor"},"#,
                r#""enabled_by_default":true,"#,
                r#""name":"Temperature","#,
                r#""state_class":"measurement","#,
                r#""state_topic":"homeassistant/sensor/Pi4/state","#,
                r#""unique_id":"pi4_temperature","#,
                r#""unit_of_measurement":"°C","#,
                r#""value_template":"{{ value_json.BME280_temperature }}"}"#
            )
        );
    }

    #[test]
    fn sea_level_descriptor_uses_pressure_class() {
        let descriptor = DiscoveryDescriptor::new(Metric::SeaLevel, &context(Some(92.0)));

        assert_eq!(descriptor.device_class, "pressure");
        assert_eq!(descriptor.unique_id, "pi4_sealevel");
        assert_eq!(descriptor.value_template, "{{ value_json.BME280_sealevel }}");
    }

    #[test]
    fn sea_level_announced_only_when_enabled() {
        assert_eq!(DiscoveryPublisher::new(context(None)).unwrap().descriptor_count(), 3);
        assert_eq!(DiscoveryPublisher::new(context(Some(0.0))).unwrap().descriptor_count(), 4);
    }
}
