//! Countdown and score.

/// Countdown state. `Idle` shows the full duration but doesn't tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Over,
}

/// Result of delivering one clock tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running; nothing changed.
    Ignored,
    Counted { remaining: u32 },
    /// This tick reached zero and ended the run.
    Expired,
}

#[derive(Debug, Clone)]
pub struct TimerAndScore {
    state: TimerState,
    remaining: u32,
    score: u64,
}

impl TimerAndScore {
    pub fn new(duration: u32) -> Self {
        Self {
            state: TimerState::Idle,
            remaining: duration,
            score: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> TimerState {
        self.state
    }

    #[inline]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    #[inline]
    pub fn score(&self) -> u64 {
        self.score
    }

    #[inline]
    pub fn is_over(&self) -> bool {
        self.state == TimerState::Over
    }

    /// Mode changed before the run started: show the new full duration.
    pub fn reset_duration(&mut self, duration: u32) {
        if self.state == TimerState::Idle {
            self.remaining = duration;
        }
    }

    /// Mode changed mid-run: never leave more time than the new mode allows.
    pub fn clamp_remaining(&mut self, duration: u32) {
        if self.state == TimerState::Running {
            self.remaining = self.remaining.min(duration);
        }
    }

    /// Award `sum * multiplier` and reset the countdown in one step.
    /// Starts the countdown on the first merge. Returns the points awarded.
    pub fn on_merge(&mut self, sum: u64, multiplier: u64, duration: u32) -> u64 {
        if self.state == TimerState::Over {
            return 0;
        }
        let points = sum.saturating_mul(multiplier);
        self.score = self.score.saturating_add(points);
        self.remaining = duration;
        self.state = TimerState::Running;
        points
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.state != TimerState::Running {
            return TickOutcome::Ignored;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = TimerState::Over;
            TickOutcome::Expired
        } else {
            TickOutcome::Counted {
                remaining: self.remaining,
            }
        }
    }

    pub fn restart(&mut self, duration: u32) {
        *self = Self::new(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_idle_does_not_tick() {
        let mut t = TimerAndScore::new(30);
        assert_eq!(t.tick(), TickOutcome::Ignored);
        assert_eq!(t.remaining(), 30);
        assert_eq!(t.state(), TimerState::Idle);
    }

    #[test]
    fn test_first_merge_starts_running() {
        let mut t = TimerAndScore::new(30);
        assert_eq!(t.on_merge(2, 2, 30), 4);
        assert_eq!(t.state(), TimerState::Running);
        assert_eq!(t.tick(), TickOutcome::Counted { remaining: 29 });
    }

    #[test]
    fn test_expiry_is_terminal() {
        let mut t = TimerAndScore::new(2);
        t.on_merge(2, 1, 2);
        assert_eq!(t.tick(), TickOutcome::Counted { remaining: 1 });
        assert_eq!(t.tick(), TickOutcome::Expired);
        assert!(t.is_over());
        assert_eq!(t.tick(), TickOutcome::Ignored);
        assert_eq!(t.remaining(), 0);
        assert_eq!(t.on_merge(8, 1, 2), 0);
        assert_eq!(t.score(), 2);
    }

    #[test]
    fn test_merge_resets_countdown() {
        let mut t = TimerAndScore::new(10);
        t.on_merge(2, 1, 10);
        for _ in 0..7 {
            t.tick();
        }
        assert_eq!(t.remaining(), 3);
        t.on_merge(3, 1, 10);
        assert_eq!(t.remaining(), 10);
    }

    #[test]
    fn test_reset_duration_only_when_idle() {
        let mut t = TimerAndScore::new(30);
        t.reset_duration(60);
        assert_eq!(t.remaining(), 60);
        t.on_merge(2, 1, 60);
        t.tick();
        t.reset_duration(15);
        assert_eq!(t.remaining(), 59);
    }

    #[test]
    fn test_clamp_remaining_only_shrinks_while_running() {
        let mut t = TimerAndScore::new(60);
        t.clamp_remaining(30);
        assert_eq!(t.remaining(), 60, "idle timer is left to reset_duration");
        t.on_merge(2, 1, 60);
        t.clamp_remaining(30);
        assert_eq!(t.remaining(), 30);
        t.clamp_remaining(60);
        assert_eq!(t.remaining(), 30);
    }

    #[test]
    fn test_restart() {
        let mut t = TimerAndScore::new(5);
        t.on_merge(5, 3, 5);
        t.restart(15);
        assert_eq!(t.state(), TimerState::Idle);
        assert_eq!(t.score(), 0);
        assert_eq!(t.remaining(), 15);
    }

    proptest! {
        #[test]
        fn ticks_count_down_and_clamp(d in 1u32..200, n in 0u32..400) {
            let mut t = TimerAndScore::new(d);
            t.on_merge(2, 1, d);
            for _ in 0..n {
                t.tick();
            }
            prop_assert_eq!(t.remaining(), d.saturating_sub(n));
            prop_assert_eq!(t.remaining() == 0, t.is_over());
        }

        #[test]
        fn score_is_multiplier_times_sum(sums in prop::collection::vec(1u64..10_000, 0..50), m in 1u64..4) {
            let mut forward = TimerAndScore::new(30);
            for s in &sums {
                forward.on_merge(*s, m, 30);
            }
            let mut backward = TimerAndScore::new(30);
            for s in sums.iter().rev() {
                backward.on_merge(*s, m, 30);
            }
            prop_assert_eq!(forward.score(), m * sums.iter().sum::<u64>());
            prop_assert_eq!(forward.score(), backward.score());
        }
    }
}
