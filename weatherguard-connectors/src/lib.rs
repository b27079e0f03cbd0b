//! Telemetry Bus Connectors
//!
//! ## Overview
//!
//! WeatherGuard publishes to an MQTT broker in the layout Home Assistant's
//! MQTT discovery expects. Everything below the sampling loop that touches the
//! bus lives here:
//!
//! - [`AsyncConnector`]: what the loop and the discovery publisher need from a bus
//! - [`mqtt`]: the real connection, built on `rumqttc`
//! - [`memory`]: in-process connector for tests and dry runs
//! - [`discovery`]: per-metric discovery descriptors, re-announced on every connect
//! - [`topics`] and [`context`]: the topic layout and the identifiers shared by all components
//! - [`payload`]: the JSON state message
//!
//! ## Topic Layout
//!
//! ```text
//! {root}/sensor/{host}/status                      retained  online | offline
//! {root}/sensor/{host}/state                       JSON readings, once per minute
//! {root}/sensor/{host}/{section}_temperature/config  retained discovery descriptor
//! {root}/sensor/{host}/{section}_humidity/config
//! {root}/sensor/{host}/{section}_pressure/config
//! {root}/sensor/{host}/{section}_sealevel/config     only with sea-level correction
//! ```
//!
//! ## Connection Lifecycle
//!
//! The connector owns a single [`ConnectionState`] cell, written only by the
//! task driving the network. Interested parties hold a
//! `watch::Receiver<ConnectionState>` from [`AsyncConnector::subscribe`]:
//!
//! ```text
//!   Disconnected ──ConnAck──▶ Connected ──error / disconnect──▶ Disconnected
//!                                 │
//!                                 └─▶ DiscoveryPublisher re-announces
//! ```
//!
//! Brokers in the target deployment do not keep retained discovery messages
//! across restarts, so descriptors are re-asserted on every transition into
//! `Connected`, not only the first.
//!
//! ## Delivery
//!
//! Publishing is fire-and-forget from the loop's point of view. A publish
//! during an outage is queued or dropped by the client; the loop never blocks
//! on the bus after the initial connection.
//!
//! ## Example Usage
//!
//! ```rust
//! use weatherguard_connectors::{memory::MemoryConnector, AsyncConnector, ConnectionState};
//!
//! # tokio_test_block_on(async {
//! let bus = MemoryConnector::new();
//! bus.set_state(ConnectionState::Connected);
//! bus.publish("home/sensor/pi/status", b"online", true).await?;
//! assert_eq!(bus.messages().len(), 1);
//! # Ok::<(), weatherguard_connectors::ConnectorError>(())
//! # }).unwrap();
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod context;
pub mod discovery;
pub mod memory;
pub mod payload;
pub mod topics;

#[cfg(feature = "mqtt")]
pub mod mqtt;

// Re-export common types
pub use context::SensorContext;
pub use discovery::{DiscoveryDescriptor, DiscoveryPublisher, Metric};
pub use memory::MemoryConnector;
pub use payload::StatePayload;
pub use topics::TopicSet;

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttConnector, MqttDriver, QoS};

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

/// Availability payload published while the sensor is reporting
pub const AVAILABILITY_ONLINE: &str = "online";

/// Availability payload published on shutdown and registered as last will
pub const AVAILABILITY_OFFLINE: &str = "offline";

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Not connected")]
    NotConnected,

    #[error("Timeout")]
    Timeout,

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Bus connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Async publish interface shared by all connectors
///
/// Handles are cheap to share; every method takes `&self`.
#[async_trait]
pub trait AsyncConnector: Send + Sync {
    /// Publish `payload` on `topic`; `retain` asks the broker to keep it for
    /// late subscribers
    async fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), ConnectorError>;

    /// Release the connection
    async fn disconnect(&self) -> Result<(), ConnectorError>;

    /// Current connection state
    fn state(&self) -> ConnectionState;

    /// Check if connected
    fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Subscribe to connection state changes
    fn subscribe(&self) -> watch::Receiver<ConnectionState>;

    /// Get connection statistics
    fn stats(&self) -> ConnectionStats;
}

#[async_trait]
impl<C: AsyncConnector + ?Sized> AsyncConnector for Arc<C> {
    async fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), ConnectorError> {
        (**self).publish(topic, payload, retain).await
    }

    async fn disconnect(&self) -> Result<(), ConnectorError> {
        (**self).disconnect().await
    }

    fn state(&self) -> ConnectionState {
        (**self).state()
    }

    fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        (**self).subscribe()
    }

    fn stats(&self) -> ConnectionStats {
        (**self).stats()
    }
}

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Total messages handed to the client successfully
    pub messages_sent: u64,
    /// Total messages the client refused
    pub messages_failed: u64,
    /// Total payload bytes sent
    pub bytes_sent: u64,
    /// Number of transitions into `Connected` after the first
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    pub(crate) fn record_sent(&mut self, bytes: usize) {
        self.messages_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    pub(crate) fn record_failed(&mut self, error: &ConnectorError) {
        self.messages_failed += 1;
        self.last_error = Some(error.to_string());
    }
}
