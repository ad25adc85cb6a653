//! Fixed-interval tick source for the countdown.
//!
//! The host asks how many ticks are due each frame. Pausing keeps the partial
//! interval so a pause/resume cycle neither gains nor loses time.

use std::time::{Duration, Instant};

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ClockSource {
    interval: Duration,
    /// Start of the interval currently being accumulated. None while paused.
    anchor: Option<Instant>,
    /// Progress into the current interval at the moment of pausing.
    carry: Duration,
}

impl ClockSource {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            anchor: Some(now),
            carry: Duration::ZERO,
        }
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.anchor.is_none()
    }

    /// Whole intervals elapsed since the last call; advances by exactly that many.
    pub fn due_ticks(&mut self, now: Instant) -> u32 {
        let Some(anchor) = self.anchor else {
            return 0;
        };
        let elapsed = now.saturating_duration_since(anchor);
        let n = (elapsed.as_nanos() / self.interval.as_nanos().max(1)) as u32;
        if n > 0 {
            self.anchor = Some(anchor + self.interval * n);
        }
        n
    }

    pub fn pause(&mut self, now: Instant) {
        if let Some(anchor) = self.anchor.take() {
            let elapsed = now.saturating_duration_since(anchor);
            let interval_ns = self.interval.as_nanos().max(1);
            let rem = elapsed.as_nanos() % interval_ns;
            self.carry = Duration::from_nanos(rem as u64);
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if self.anchor.is_none() {
            self.anchor = Some(now.checked_sub(self.carry).unwrap_or(now));
            self.carry = Duration::ZERO;
        }
    }

    /// Start a fresh interval at `now`, dropping partial progress.
    pub fn rearm(&mut self, now: Instant) {
        if self.anchor.is_some() {
            self.anchor = Some(now);
        }
        self.carry = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_counts_whole_intervals() {
        let t0 = Instant::now();
        let mut c = ClockSource::new(TICK_INTERVAL, t0);
        assert_eq!(c.due_ticks(t0 + 999 * MS), 0);
        assert_eq!(c.due_ticks(t0 + 1000 * MS), 1);
        assert_eq!(c.due_ticks(t0 + 3500 * MS), 2);
        assert_eq!(c.due_ticks(t0 + 4000 * MS), 1);
    }

    #[test]
    fn test_pause_keeps_partial_interval() {
        let t0 = Instant::now();
        let mut c = ClockSource::new(TICK_INTERVAL, t0);
        c.pause(t0 + 600 * MS);
        assert!(c.is_paused());
        assert_eq!(c.due_ticks(t0 + 10_000 * MS), 0);
        c.resume(t0 + 10_000 * MS);
        assert_eq!(c.due_ticks(t0 + 10_399 * MS), 0);
        assert_eq!(c.due_ticks(t0 + 10_400 * MS), 1);
    }

    #[test]
    fn test_rearm_drops_progress() {
        let t0 = Instant::now();
        let mut c = ClockSource::new(TICK_INTERVAL, t0);
        c.rearm(t0 + 900 * MS);
        assert_eq!(c.due_ticks(t0 + 1500 * MS), 0);
        assert_eq!(c.due_ticks(t0 + 1900 * MS), 1);
    }
}
