//! Time sources.
//!
//! Token expiry needs wall-clock seconds, window accounting needs a
//! monotonic instant. Both come from one [`Clock`] so tests can move time
//! forward with a [`ManualClock`].

use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    /// Monotonic instant used for rate-limit windows.
    fn now(&self) -> Instant;

    /// Seconds since the Unix epoch, used for token `exp`.
    fn unix_now(&self) -> u64;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    unix_origin: u64,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Starts at the current system time.
    pub fn new() -> Self {
        Self::starting_at(SystemClock.unix_now())
    }

    /// Starts at the given Unix timestamp.
    pub fn starting_at(unix_secs: u64) -> Self {
        Self {
            origin: Instant::now(),
            unix_origin: unix_secs,
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }

    fn offset(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset()
    }

    fn unix_now(&self) -> u64 {
        self.unix_origin + self.offset().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_frozen_until_advanced() {
        let clock = ManualClock::starting_at(1_000);
        let first = clock.now();
        assert_eq!(clock.now(), first);
        assert_eq!(clock.unix_now(), 1_000);

        clock.advance(Duration::from_secs(90));

        assert_eq!(clock.now().duration_since(first), Duration::from_secs(90));
        assert_eq!(clock.unix_now(), 1_090);
    }

    #[test]
    fn system_clock_reports_plausible_epoch_seconds() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.unix_now() > 1_577_836_800);
    }
}
