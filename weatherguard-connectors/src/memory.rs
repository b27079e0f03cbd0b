//! In-process connector
//!
//! Records every publish instead of sending it. Used by the test suites and by
//! the daemon's `--dry-run` mode, where each message is also logged so the
//! output can be checked against a real broker's.
//!
//! The connection state is driven by hand with [`MemoryConnector::set_state`],
//! which makes reconnect behaviour easy to exercise.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use log::info;
use tokio::sync::watch;

use crate::{AsyncConnector, ConnectionState, ConnectionStats, ConnectorError};

/// One recorded publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

impl Message {
    /// Payload as text; lossy for non-UTF-8 bodies
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

#[derive(Debug, Default)]
struct Inner {
    messages: Vec<Message>,
    stats: ConnectionStats,
    ever_connected: bool,
}

/// Connector that keeps what it is given
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    inner: Arc<Mutex<Inner>>,
    state: Arc<watch::Sender<ConnectionState>>,
    echo: bool,
    reject_while_disconnected: bool,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnector {
    /// Starts disconnected and accepts publishes in any state
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            state: Arc::new(state),
            echo: false,
            reject_while_disconnected: false,
        }
    }

    /// Log each publish at info level
    pub fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Refuse publishes with `NotConnected` while disconnected
    pub fn strict(mut self) -> Self {
        self.reject_while_disconnected = true;
        self
    }

    /// Move to `state`, notifying subscribers on change
    pub fn set_state(&self, state: ConnectionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });

        if changed && state.is_connected() {
            let mut inner = self.lock();
            if inner.ever_connected {
                inner.stats.reconnections += 1;
            }
            inner.ever_connected = true;
        }
    }

    /// Everything published so far, oldest first
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    /// Messages published on `topic`, oldest first
    pub fn messages_on(&self, topic: &str) -> Vec<Message> {
        self.lock()
            .messages
            .iter()
            .filter(|message| message.topic == topic)
            .cloned()
            .collect()
    }

    /// Most recent retained payload per topic, as a broker would hold it
    pub fn retained(&self, topic: &str) -> Option<Message> {
        self.lock()
            .messages
            .iter()
            .rev()
            .find(|message| message.topic == topic && message.retain)
            .cloned()
    }

    pub fn clear(&self) {
        self.lock().messages.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread must not hide what was recorded
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AsyncConnector for MemoryConnector {
    async fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), ConnectorError> {
        let mut inner = self.lock();

        if self.reject_while_disconnected && !self.state.borrow().is_connected() {
            let error = ConnectorError::NotConnected;
            inner.stats.record_failed(&error);
            return Err(error);
        }

        if self.echo {
            info!(
                "publish {}{}: {}",
                topic,
                if retain { " (retained)" } else { "" },
                String::from_utf8_lossy(payload)
            );
        }

        inner.stats.record_sent(payload.len());
        inner.messages.push(Message {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            retain,
        });
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ConnectorError> {
        self.set_state(ConnectionState::Disconnected);
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    fn stats(&self) -> ConnectionStats {
        self.lock().stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_in_order() {
        let bus = MemoryConnector::new();
        bus.publish("a", b"1", false).await.unwrap();
        bus.publish("b", b"2", true).await.unwrap();

        let messages = bus.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].topic, "a");
        assert!(messages[1].retain);
        assert_eq!(bus.stats().bytes_sent, 2);
    }

    #[tokio::test]
    async fn retained_tracks_latest() {
        let bus = MemoryConnector::new();
        bus.publish("status", b"online", true).await.unwrap();
        bus.publish("status", b"transient", false).await.unwrap();
        bus.publish("status", b"offline", true).await.unwrap();

        assert_eq!(bus.retained("status").unwrap().text(), "offline");
        assert_eq!(bus.messages_on("status").len(), 3);
        assert!(bus.retained("other").is_none());
    }

    #[tokio::test]
    async fn strict_rejects_while_disconnected() {
        let bus = MemoryConnector::new().strict();
        assert!(matches!(
            bus.publish("t", b"x", false).await,
            Err(ConnectorError::NotConnected)
        ));

        bus.set_state(ConnectionState::Connected);
        bus.publish("t", b"x", false).await.unwrap();
        assert_eq!(bus.stats().messages_failed, 1);
        assert_eq!(bus.stats().messages_sent, 1);
    }

    #[test]
    fn reconnections_counted_after_first_connect() {
        let bus = MemoryConnector::new();
        bus.set_state(ConnectionState::Connected);
        bus.set_state(ConnectionState::Connected);
        bus.set_state(ConnectionState::Disconnected);
        bus.set_state(ConnectionState::Connected);

        assert_eq!(bus.stats().reconnections, 1);
    }
}
