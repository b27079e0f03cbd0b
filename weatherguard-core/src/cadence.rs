//! Wall-clock aligned publish cadence
//!
//! The loop polls every second but publishes only when the wall clock,
//! rounded to whole seconds, is a multiple of the publish period. With the
//! default period that is the top of every minute, so every station on the
//! bus reports at the same instant regardless of when it was started.
//!
//! Polls are not perfectly spaced - a read takes a few milliseconds - so two
//! polls can round to the same second. A boundary is handed out once.

use crate::{
    constants::time::PUBLISH_PERIOD_S,
    time::{round_to_seconds, Timestamp},
};

/// Decides which polls fall on a publish boundary
#[derive(Debug, Clone)]
pub struct PublishCadence {
    period_s: u64,
    last_boundary: Option<u64>,
}

impl Default for PublishCadence {
    fn default() -> Self {
        Self::new(PUBLISH_PERIOD_S)
    }
}

impl PublishCadence {
    /// Cadence with a custom period in seconds (`0` is treated as `1`)
    pub fn new(period_s: u64) -> Self {
        Self {
            period_s: period_s.max(1),
            last_boundary: None,
        }
    }

    /// Seconds between publish boundaries
    pub fn period_s(&self) -> u64 {
        self.period_s
    }

    /// Whether `now` is on a boundary not yet handed out
    ///
    /// Claims the boundary when it returns `true`.
    pub fn is_due(&mut self, now: Timestamp) -> bool {
        let second = round_to_seconds(now);
        if second % self.period_s != 0 || self.last_boundary == Some(second) {
            return false;
        }
        self.last_boundary = Some(second);
        true
    }

    /// Most recent boundary handed out (seconds since epoch)
    pub fn last_boundary(&self) -> Option<u64> {
        self.last_boundary
    }
}
