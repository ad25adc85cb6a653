//! Difficulty modes and the rules for switching between them.

use crate::error::GameError;
use clap::ValueEnum;

/// Difficulty levels, in order. Each fixes a multiplier, a countdown and a grid shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, ValueEnum)]
pub enum Mode {
    Easy,
    #[default]
    Hard,
    Extreme,
}

impl Mode {
    pub const ALL: [Self; 3] = [Self::Easy, Self::Hard, Self::Extreme];

    pub fn multiplier(self) -> u64 {
        match self {
            Self::Easy => 1,
            Self::Hard => 2,
            Self::Extreme => 3,
        }
    }

    /// Countdown length in seconds.
    pub fn duration(self) -> u32 {
        match self {
            Self::Easy => 60,
            Self::Hard => 30,
            Self::Extreme => 15,
        }
    }

    pub fn tile_count(self) -> usize {
        match self {
            Self::Easy | Self::Hard => 16,
            Self::Extreme => 9,
        }
    }

    /// Row width of the grid.
    pub fn columns(self) -> usize {
        match self {
            Self::Easy | Self::Hard => 4,
            Self::Extreme => 3,
        }
    }

    #[inline]
    pub fn is_extreme(self) -> bool {
        self == Self::Extreme
    }

    /// Valid merge targets are only highlighted in easy mode.
    pub fn shows_hints(self) -> bool {
        self == Self::Easy
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Easy => "EASY",
            Self::Hard => "HARD",
            Self::Extreme => "EXTREME",
        }
    }

    /// Next (or previous) mode in order, wrapping around.
    pub fn cycle(self, forward: bool) -> Self {
        let i = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        let n = Self::ALL.len();
        let j = if forward { (i + 1) % n } else { (i + n - 1) % n };
        Self::ALL[j]
    }
}

/// What a successful `set_mode` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    Unchanged,
    Switched { reshape: bool },
}

/// Owns the active mode and the extreme-mode lock.
#[derive(Debug, Clone)]
pub struct ModeController {
    mode: Mode,
    locked_to_extreme: bool,
}

impl ModeController {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            locked_to_extreme: false,
        }
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    pub fn locked_to_extreme(&self) -> bool {
        self.locked_to_extreme
    }

    pub fn multiplier(&self) -> u64 {
        self.mode.multiplier()
    }

    pub fn duration(&self) -> u32 {
        self.mode.duration()
    }

    /// Whether `to` is reachable right now. Once a run has started the run may not
    /// cross the extreme boundary in either direction.
    pub fn can_switch(&self, to: Mode, started: bool) -> bool {
        to == self.mode || !started || to.is_extreme() == self.locked_to_extreme
    }

    /// Switch modes. The caller resets the timer and reshapes the grid when the
    /// run hasn't started yet.
    pub fn set_mode(&mut self, to: Mode, started: bool) -> Result<ModeChange, GameError> {
        if to == self.mode {
            return Ok(ModeChange::Unchanged);
        }
        if !self.can_switch(to, started) {
            return Err(GameError::IllegalModeTransition {
                from: self.mode,
                to,
            });
        }
        let reshape = !started && to.tile_count() != self.mode.tile_count();
        self.mode = to;
        Ok(ModeChange::Switched { reshape })
    }

    /// First merge of a run: remember which side of the extreme boundary it began on.
    pub fn on_run_started(&mut self) {
        self.locked_to_extreme = self.mode.is_extreme();
    }

    pub fn unlock(&mut self) {
        self.locked_to_extreme = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_table_is_total() {
        for mode in Mode::ALL {
            assert!(mode.multiplier() >= 1);
            assert!(mode.duration() > 0);
            assert_eq!(mode.tile_count() % mode.columns(), 0);
        }
        assert_eq!(Mode::Extreme.tile_count(), 9);
        assert_eq!(Mode::Easy.tile_count(), 16);
        assert_eq!(Mode::Hard.multiplier(), 2);
    }

    #[test]
    fn test_cycle_wraps() {
        assert_eq!(Mode::Easy.cycle(true), Mode::Hard);
        assert_eq!(Mode::Extreme.cycle(true), Mode::Easy);
        assert_eq!(Mode::Easy.cycle(false), Mode::Extreme);
    }

    #[test]
    fn test_same_mode_is_noop() {
        let mut mc = ModeController::new(Mode::Hard);
        assert_eq!(mc.set_mode(Mode::Hard, true), Ok(ModeChange::Unchanged));
    }

    #[test]
    fn test_free_switch_before_start() {
        let mut mc = ModeController::new(Mode::Hard);
        assert_eq!(
            mc.set_mode(Mode::Extreme, false),
            Ok(ModeChange::Switched { reshape: true })
        );
        assert_eq!(
            mc.set_mode(Mode::Easy, false),
            Ok(ModeChange::Switched { reshape: true })
        );
        assert_eq!(
            mc.set_mode(Mode::Hard, false),
            Ok(ModeChange::Switched { reshape: false })
        );
    }

    #[test]
    fn test_extreme_run_is_locked() {
        let mut mc = ModeController::new(Mode::Extreme);
        mc.on_run_started();
        assert!(mc.locked_to_extreme());
        assert!(matches!(
            mc.set_mode(Mode::Easy, true),
            Err(GameError::IllegalModeTransition { .. })
        ));
        assert_eq!(mc.mode(), Mode::Extreme);
    }

    #[test]
    fn test_ordinary_run_cannot_enter_extreme() {
        let mut mc = ModeController::new(Mode::Easy);
        mc.on_run_started();
        assert!(!mc.locked_to_extreme());
        assert!(mc.set_mode(Mode::Extreme, true).is_err());
        assert_eq!(
            mc.set_mode(Mode::Hard, true),
            Ok(ModeChange::Switched { reshape: false })
        );
        assert_eq!(mc.multiplier(), 2);
    }

    #[test]
    fn test_unlock_frees_switching() {
        let mut mc = ModeController::new(Mode::Extreme);
        mc.on_run_started();
        mc.unlock();
        assert!(mc.set_mode(Mode::Hard, false).is_ok());
    }
}
