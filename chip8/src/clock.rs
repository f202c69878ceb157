//! Fixed rate clocks for drivers.
use std::{
    thread,
    time::{Duration, Instant},
};

use crate::constants::*;

/// Frequency, in hertz (per second)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

/// Elapsed time accumulator that produces ticks at a fixed interval.
///
/// It is designed to work with the yielding cooperative pattern
/// of a driver loop. The driver polls the clock for how many periods
/// have elapsed since the last poll, and runs that many steps or timer ticks.
///
/// A clock with a zero interval is unthrottled, and always reports one tick.
#[derive(Debug)]
pub struct Clock {
    interval: Duration,
    last: Instant,
    /// Upper bound on periods reported by a single poll.
    max_backlog: u64,
}

impl Clock {
    /// Default upper bound on ticks reported after a long stall.
    pub const DEFAULT_BACKLOG: u64 = 16;

    /// Creates a new clock with the current time as internal state.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Instant::now(),
            max_backlog: Self::DEFAULT_BACKLOG,
        }
    }

    pub fn from_hz(freq: Hz) -> Self {
        Self::new(freq.into())
    }

    pub fn from_nanos(nanos: u64) -> Self {
        Self::new(Duration::from_nanos(nanos))
    }

    /// Clock running at the fixed 60Hz rate of the delay and sound timers.
    pub fn timers() -> Self {
        Self::from_nanos(TIMER_CYCLE_TIME)
    }

    /// Limit the periods reported by one poll, between 1 and `u32::MAX`.
    pub fn with_backlog(mut self, max_backlog: u64) -> Self {
        self.max_backlog = max_backlog.clamp(1, u32::MAX as u64);
        self
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Consume and return the number of whole periods elapsed since the last poll.
    pub fn ticks(&mut self) -> u64 {
        self.ticks_at(Instant::now())
    }

    /// Same as [`Clock::ticks`], with an explicit current time.
    pub fn ticks_at(&mut self, now: Instant) -> u64 {
        if self.interval.is_zero() {
            self.last = now;
            return 1;
        }

        let elapsed = now.saturating_duration_since(self.last);
        let count = (elapsed.as_nanos() / self.interval.as_nanos()) as u64;

        if count > self.max_backlog {
            // Rather than trying to catch up after the driver was stalled,
            // continue at the usual speed from now on.
            self.last = now;
            self.max_backlog
        } else {
            // Keep the remainder so the rate doesn't drift.
            self.last += self.interval * count as u32;
            count
        }
    }

    /// Time left until the next period elapses.
    pub fn until_next(&self) -> Duration {
        self.interval.saturating_sub(self.last.elapsed())
    }

    /// Block the current thread until the next clock cycle.
    pub fn wait(&self) {
        while !self.until_next().is_zero() {
            // Sleep does not have enough resolution at high frequencies.
            //
            // Yielding in a loop is the best alternative.
            thread::yield_now();
        }
    }
}
