//! Game time and injectable clocks.
//!
//! The battle loop never sleeps. It records when the next scheduled step is
//! due and the caller advances it with the current [`GameTime`].

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Milliseconds since the clock started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GameTime(u64);

impl GameTime {
    /// Time zero.
    pub const ZERO: Self = Self(0);

    /// Creates a time from milliseconds.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the time in milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Returns this time shifted forward, saturating at the maximum.
    #[must_use]
    pub fn after(self, delay: Duration) -> Self {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }
}

/// A source of the current game time.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> GameTime;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> GameTime {
        (**self).now()
    }
}

/// Wall-clock time measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Starts a new clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> GameTime {
        let elapsed = u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX);
        GameTime::from_millis(elapsed)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Creates a clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward.
    pub fn advance(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.millis.fetch_add(millis, Ordering::Relaxed);
    }

    /// Jumps to an absolute time.
    pub fn set(&self, time: GameTime) {
        self.millis.store(time.as_millis(), Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> GameTime {
        GameTime::from_millis(self.millis.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), GameTime::ZERO);
        clock.advance(Duration::from_millis(250));
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now().as_millis(), 1250);
        clock.set(GameTime::from_millis(10));
        assert_eq!(clock.now().as_millis(), 10);
    }

    #[test]
    fn test_game_time_after_saturates() {
        let late = GameTime::from_millis(u64::MAX - 1);
        assert_eq!(late.after(Duration::from_secs(5)).as_millis(), u64::MAX);
        assert_eq!(
            GameTime::ZERO.after(Duration::from_millis(900)),
            GameTime::from_millis(900)
        );
    }

    #[test]
    fn test_shared_clock_reads_through_arc() {
        let clock = Arc::new(ManualClock::new());
        let shared: Arc<dyn Clock> = clock.clone();
        clock.advance(Duration::from_millis(5));
        assert_eq!(shared.now().as_millis(), 5);
    }
}
