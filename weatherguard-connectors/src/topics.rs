//! Topic layout under `{root}/sensor/{host}/`

use crate::discovery::Metric;

/// Every topic one sensor publishes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSet {
    /// Retained `online` / `offline`
    pub availability: String,
    /// JSON readings
    pub state: String,
    base: String,
    section: String,
}

impl TopicSet {
    pub fn new(root: &str, host: &str, section: &str) -> Self {
        let base = format!("{}/sensor/{}", root.trim_end_matches('/'), host);
        Self {
            availability: format!("{base}/status"),
            state: format!("{base}/state"),
            base,
            section: section.to_string(),
        }
    }

    /// Discovery topic for one metric, e.g. `.../BME280_temperature/config`
    pub fn discovery(&self, metric: Metric) -> String {
        format!("{}/{}_{}/config", self.base, self.section, metric.key())
    }
}
