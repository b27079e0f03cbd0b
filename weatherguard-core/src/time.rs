//! Time sources for the sampling loop
//!
//! Publish boundaries are wall-clock aligned, so the loop asks a
//! [`TimeSource`] for the current time instead of reading the system clock
//! directly. Production uses [`SystemTime`]; replayed loops use
//! [`SteppingTime`], which advances one poll per read.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::constants::MS_PER_SECOND;

/// Timestamp in milliseconds since the Unix epoch
pub type Timestamp = u64;

/// Wall-clock source
pub trait TimeSource: Send + Sync {
    /// Current time in milliseconds since the epoch
    fn now(&self) -> Timestamp;
}

/// The system clock (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

#[cfg(feature = "std")]
impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime as StdSystemTime, UNIX_EPOCH};

        // A clock set before 1970 reads as the epoch
        StdSystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as Timestamp)
            .unwrap_or(0)
    }
}

/// Clock that moves forward by a fixed step every time it is read
///
/// Each call to [`TimeSource::now`] returns the current value and then
/// advances, so a loop that reads the clock once per poll sees
/// `start, start + step, start + 2 * step, ...`.
#[derive(Debug)]
pub struct SteppingTime {
    next: AtomicU64,
    step_ms: u64,
}

impl SteppingTime {
    /// Clock reading `start` first, then moving `step_ms` per read
    pub fn new(start: Timestamp, step_ms: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
            step_ms,
        }
    }

    /// Value the next call to `now` will return
    pub fn peek(&self) -> Timestamp {
        self.next.load(Ordering::SeqCst)
    }
}

impl TimeSource for SteppingTime {
    fn now(&self) -> Timestamp {
        self.next.fetch_add(self.step_ms, Ordering::SeqCst)
    }
}

/// Round a millisecond timestamp to the nearest whole second
///
/// Half a second rounds up, so a poll landing at `59.5 s` counts as `60 s`.
pub fn round_to_seconds(timestamp: Timestamp) -> u64 {
    (timestamp + MS_PER_SECOND / 2) / MS_PER_SECOND
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepping_time_moves_on_every_read() {
        let clock = SteppingTime::new(59_000, 1000);
        assert_eq!(clock.now(), 59_000);
        assert_eq!(clock.now(), 60_000);
        assert_eq!(clock.peek(), 61_000);
    }

    #[test]
    fn rounding_to_seconds() {
        assert_eq!(round_to_seconds(59_499), 59);
        assert_eq!(round_to_seconds(59_500), 60);
        assert_eq!(round_to_seconds(60_000), 60);
        assert_eq!(round_to_seconds(0), 0);
    }

    #[cfg(feature = "std")]
    #[test]
    fn system_time_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemTime.now() > 1_577_836_800_000);
    }
}
