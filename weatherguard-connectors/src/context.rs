//! Identifiers shared by the loop, the discovery publisher and the bus
//!
//! Built once at startup and handed out behind an `Arc`; nothing here changes
//! while the process runs.

use weatherguard_core::CalibrationConfig;

use crate::topics::TopicSet;

/// Who this sensor is and where it publishes
#[derive(Debug, Clone, PartialEq)]
pub struct SensorContext {
    /// Host identity used in topics, unique ids and the device name
    pub host: String,
    /// Configuration section; prefixes payload keys and discovery topics
    pub section: String,
    /// Bus root path, e.g. `homeassistant`
    pub root_topic: String,
    pub topics: TopicSet,
    /// Whether the sea-level metric is announced and published
    pub sea_level_enabled: bool,
}

impl SensorContext {
    pub fn new(root_topic: &str, host: &str, calibration: &CalibrationConfig) -> Self {
        Self {
            host: host.to_string(),
            section: calibration.section.clone(),
            root_topic: root_topic.to_string(),
            topics: TopicSet::new(root_topic, host, &calibration.section),
            sea_level_enabled: calibration.sea_level_enabled(),
        }
    }
}
