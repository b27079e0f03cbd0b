//! MQTT connector
//!
//! ## Overview
//!
//! A thin layer over `rumqttc`. The client is split in two:
//!
//! - [`MqttConnector`]: a cloneable handle implementing [`AsyncConnector`];
//!   publishes are queued without waiting on the network
//! - [`MqttDriver`]: owns the event loop and must be polled on its own task;
//!   it performs the (re)connects and is the only writer of the
//!   [`ConnectionState`] cell
//!
//! ```text
//!   telemetry loop ─┐                        ┌─▶ ConnAck ──▶ Connected
//!                   ├─▶ MqttConnector ─queue─▶ MqttDriver
//!   discovery ──────┘        ▲               └─▶ error ───▶ Disconnected, retry in 5 s
//!                            └──── watch<ConnectionState> ◀──┘
//! ```
//!
//! ## Availability
//!
//! A retained `offline` is registered as last will on the availability topic
//! so the broker marks the sensor unavailable if the process dies without a
//! clean shutdown. `online` is published by the discovery publisher after
//! every connect.
//!
//! ## Connect Timeout
//!
//! While disconnected each poll of the event loop is bounded by
//! `connect_timeout`; a broker that accepts TCP but never answers the MQTT
//! handshake is treated like a refused connection.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, LastWill, MqttOptions, Outgoing, Packet};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use weatherguard_core::constants::time::{CONNECT_TIMEOUT_S, KEEP_ALIVE_S, RECONNECT_DELAY_S};

use crate::{AsyncConnector, ConnectionState, ConnectionStats, ConnectorError, AVAILABILITY_OFFLINE};

pub use rumqttc::QoS;

/// Outbound request queue depth
const REQUEST_CAPACITY: usize = 32;

/// Broker connection settings
#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    /// Username and password; only sent when both are configured
    pub credentials: Option<(String, String)>,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
    pub reconnect_delay: Duration,
    /// Topic receiving the retained `offline` last will
    pub availability_topic: Option<String>,
    /// QoS for state, discovery and availability publishes
    pub qos: QoS,
}

impl MqttConfig {
    pub fn new(host: impl Into<String>, port: u16, client_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: client_id.into(),
            credentials: None,
            keep_alive: Duration::from_secs(KEEP_ALIVE_S),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_S),
            reconnect_delay: Duration::from_secs(RECONNECT_DELAY_S),
            availability_topic: None,
            qos: QoS::AtMostOnce,
        }
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Register a retained `offline` last will on `topic`
    pub fn last_will(mut self, topic: impl Into<String>) -> Self {
        self.availability_topic = Some(topic.into());
        self
    }

    pub fn keep_alive_secs(mut self, secs: u64) -> Self {
        self.keep_alive = Duration::from_secs(secs);
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Client options as handed to `rumqttc`
    pub fn to_options(&self) -> Result<MqttOptions, ConnectorError> {
        if self.host.is_empty() {
            return Err(ConnectorError::ConfigError("broker host is empty".into()));
        }
        if self.client_id.is_empty() {
            return Err(ConnectorError::ConfigError("client id is empty".into()));
        }

        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);

        if let Some((username, password)) = &self.credentials {
            options.set_credentials(username, password);
        }
        if let Some(topic) = &self.availability_topic {
            options.set_last_will(LastWill::new(
                topic,
                AVAILABILITY_OFFLINE.as_bytes().to_vec(),
                QoS::AtLeastOnce,
                true,
            ));
        }

        Ok(options)
    }
}

/// Publish handle
#[derive(Clone)]
pub struct MqttConnector {
    client: AsyncClient,
    state: watch::Receiver<ConnectionState>,
    stats: Arc<Mutex<ConnectionStats>>,
    qos: QoS,
}

/// Event loop half; poll with [`MqttDriver::run`] or [`MqttDriver::spawn`]
pub struct MqttDriver {
    eventloop: EventLoop,
    state: watch::Sender<ConnectionState>,
    stats: Arc<Mutex<ConnectionStats>>,
    connect_timeout: Duration,
    reconnect_delay: Duration,
    ever_connected: bool,
}

impl MqttConnector {
    /// Build the handle and its driver; nothing touches the network until the
    /// driver runs
    pub fn new(config: &MqttConfig) -> Result<(Self, MqttDriver), ConnectorError> {
        let options = config.to_options()?;
        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let stats = Arc::new(Mutex::new(ConnectionStats::default()));

        debug!(
            "mqtt client {} for {}:{} (keepalive {:?})",
            config.client_id, config.host, config.port, config.keep_alive
        );

        let connector = Self {
            client,
            state: state_rx,
            stats: Arc::clone(&stats),
            qos: config.qos,
        };
        let driver = MqttDriver {
            eventloop,
            state: state_tx,
            stats,
            connect_timeout: config.connect_timeout,
            reconnect_delay: config.reconnect_delay,
            ever_connected: false,
        };

        Ok((connector, driver))
    }
}

#[async_trait]
impl AsyncConnector for MqttConnector {
    async fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), ConnectorError> {
        // try_publish never waits on a full queue; the loop must not stall on the bus
        let result = self
            .client
            .try_publish(topic, self.qos, retain, payload.to_vec())
            .map_err(|e| ConnectorError::ProtocolError(e.to_string()));

        let mut stats = lock(&self.stats);
        match &result {
            Ok(()) => stats.record_sent(payload.len()),
            Err(e) => stats.record_failed(e),
        }
        result
    }

    async fn disconnect(&self) -> Result<(), ConnectorError> {
        // A broker outage leaves the request queue full; waiting for room
        // there would never return
        self.client
            .try_disconnect()
            .map_err(|e| ConnectorError::ProtocolError(format!("disconnect not queued: {e}")))
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    fn stats(&self) -> ConnectionStats {
        lock(&self.stats).clone()
    }
}

impl MqttDriver {
    /// Run on a new task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Poll the event loop until the client disconnects
    pub async fn run(mut self) {
        loop {
            let connected = self.state.borrow().is_connected();
            let event = if connected {
                self.eventloop.poll().await
            } else {
                match tokio::time::timeout(self.connect_timeout, self.eventloop.poll()).await {
                    Ok(event) => event,
                    Err(_) => {
                        warn!("mqtt connect timed out after {:?}", self.connect_timeout);
                        self.record_error(&ConnectorError::Timeout);
                        continue;
                    }
                }
            };

            match event {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        self.mark_connected();
                    } else {
                        warn!("mqtt broker refused connection: {:?}", ack.code);
                        self.mark_disconnected();
                        tokio::time::sleep(self.reconnect_delay).await;
                    }
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    warn!("mqtt broker closed the session");
                    self.mark_disconnected();
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    debug!("mqtt disconnect sent; driver stopping");
                    self.mark_disconnected();
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    let error = ConnectorError::ProtocolError(e.to_string());
                    warn!("mqtt connection error: {e}; retrying in {:?}", self.reconnect_delay);
                    self.record_error(&error);
                    self.mark_disconnected();
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }

    fn mark_connected(&mut self) {
        let changed = self.state.send_if_modified(|state| {
            let was = *state;
            *state = ConnectionState::Connected;
            !was.is_connected()
        });
        if !changed {
            return;
        }

        if self.ever_connected {
            lock(&self.stats).reconnections += 1;
            info!("mqtt reconnected");
        } else {
            info!("mqtt connected");
        }
        self.ever_connected = true;
    }

    fn mark_disconnected(&mut self) {
        self.state.send_if_modified(|state| {
            let was = *state;
            *state = ConnectionState::Disconnected;
            was.is_connected()
        });
    }

    fn record_error(&self, error: &ConnectorError) {
        lock(&self.stats).last_error = Some(error.to_string());
    }
}

fn lock(stats: &Mutex<ConnectionStats>) -> MutexGuard<'_, ConnectionStats> {
    stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = MqttConfig::new("broker.local", 1883, "pi4-100");

        assert_eq!(config.keep_alive, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(60));
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert!(config.credentials.is_none());
        assert!(config.availability_topic.is_none());
    }

    #[test]
    fn options_carry_last_will() {
        let config = MqttConfig::new("broker.local", 1883, "pi4-100")
            .last_will("homeassistant/sensor/pi4/status")
            .keep_alive_secs(30);
        let options = config.to_options().unwrap();

        assert!(options.last_will().is_some());
        assert_eq!(options.keep_alive(), Duration::from_secs(30));
        assert_eq!(options.client_id(), "pi4-100");
    }

    #[test]
    fn empty_host_rejected() {
        let config = MqttConfig::new("", 1883, "id");
        assert!(matches!(config.to_options(), Err(ConnectorError::ConfigError(_))));
    }

    #[tokio::test]
    async fn handle_starts_disconnected_and_queues() {
        let config = MqttConfig::new("127.0.0.1", 1883, "test-client");
        let (bus, _driver) = MqttConnector::new(&config).unwrap();

        assert!(!bus.is_connected());
        bus.publish("t", b"queued", false).await.unwrap();
        assert_eq!(bus.stats().messages_sent, 1);
    }
}
