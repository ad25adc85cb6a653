//! Game session: wires grid merges into scoring, the countdown and the mode lock.

use crate::error::GameError;
use crate::grid::{GridEngine, TileView};
use crate::mode::{Mode, ModeChange, ModeController};
use crate::timer::{TickOutcome, TimerAndScore, TimerState};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Outcome of releasing a dragged tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// Dropped on itself: treated as a cancel.
    Cancelled,
    Merged(MergeEvent),
}

/// A merge that was accepted and scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeEvent {
    pub target: usize,
    pub sum: u64,
    pub points: u64,
}

#[derive(Debug, Clone)]
pub struct GameSession {
    grid: GridEngine,
    modes: ModeController,
    timer: TimerAndScore,
}

impl GameSession {
    pub fn new(mode: Mode) -> Self {
        Self {
            grid: GridEngine::new(mode.tile_count(), mode.columns()),
            modes: ModeController::new(mode),
            timer: TimerAndScore::new(mode.duration()),
        }
    }

    // --- read side -------------------------------------------------------

    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    pub fn score(&self) -> u64 {
        self.timer.score()
    }

    pub fn multiplier(&self) -> u64 {
        self.modes.multiplier()
    }

    pub fn remaining(&self) -> u32 {
        self.timer.remaining()
    }

    /// Full countdown length for the active mode.
    pub fn duration(&self) -> u32 {
        self.modes.duration()
    }

    pub fn timer_state(&self) -> TimerState {
        self.timer.state()
    }

    pub fn is_over(&self) -> bool {
        self.timer.is_over()
    }

    /// Whether the current run has registered its first merge.
    pub fn started(&self) -> bool {
        self.timer.state() != TimerState::Idle
    }

    pub fn locked_to_extreme(&self) -> bool {
        self.modes.locked_to_extreme()
    }

    pub fn can_switch_to(&self, mode: Mode) -> bool {
        self.modes.can_switch(mode, self.started())
    }

    pub fn shows_hints(&self) -> bool {
        self.mode().shows_hints()
    }

    pub fn tiles(&self) -> Vec<TileView> {
        self.grid.view()
    }

    pub fn tile_count(&self) -> usize {
        self.grid.len()
    }

    pub fn columns(&self) -> usize {
        self.grid.columns()
    }

    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    pub fn dragging(&self) -> Option<usize> {
        self.grid.dragging()
    }

    pub fn next_mark_deadline(&self) -> Option<Instant> {
        self.grid.next_mark_deadline()
    }

    /// No pair of tiles can merge any more.
    pub fn is_stuck(&mut self) -> bool {
        !self.grid.has_legal_merge()
    }

    // --- gestures --------------------------------------------------------

    fn ensure_playing(&self) -> Result<(), GameError> {
        if self.is_over() {
            return Err(GameError::GestureWhileOver);
        }
        Ok(())
    }

    pub fn begin_drag(&mut self, source: usize) -> Result<(), GameError> {
        self.ensure_playing()?;
        self.grid.begin_drag(source).inspect_err(|e| {
            warn!(source, error = %e, "drag rejected");
        })
    }

    pub fn cancel_drag(&mut self) {
        if let Some(source) = self.grid.dragging() {
            debug!(source, "drag cancelled");
        }
        self.grid.end_drag();
    }

    /// Release the dragged tile over `target`. Drag state is always cleared.
    pub fn drop_on(&mut self, target: usize, now: Instant) -> Result<DropOutcome, GameError> {
        if let Err(e) = self.ensure_playing() {
            self.grid.end_drag();
            return Err(e);
        }
        let Some(source) = self.grid.dragging() else {
            return Err(GameError::NoActiveDrag);
        };
        if source == target {
            self.grid.end_drag();
            debug!(source, "dropped on itself");
            return Ok(DropOutcome::Cancelled);
        }
        let result = self.merge(source, target, now);
        self.grid.end_drag();
        result.map(DropOutcome::Merged)
    }

    /// Merge `source` into `target` directly, scoring it and resetting the countdown.
    pub fn merge(
        &mut self,
        source: usize,
        target: usize,
        now: Instant,
    ) -> Result<MergeEvent, GameError> {
        self.ensure_playing()?;
        let sum = match self.grid.attempt_merge(source, target, now) {
            Ok(sum) => sum,
            Err(e) => {
                debug!(source, target, error = %e, "merge rejected");
                return Err(e);
            }
        };
        let first = !self.started();
        let points = self
            .timer
            .on_merge(sum, self.modes.multiplier(), self.modes.duration());
        if first {
            self.modes.on_run_started();
            info!(mode = ?self.mode(), locked = self.locked_to_extreme(), "run started");
        }
        info!(source, target, sum, points, score = self.score(), "merged");
        Ok(MergeEvent {
            target,
            sum,
            points,
        })
    }

    // --- clock, modes, lifecycle ------------------------------------------

    /// One countdown tick.
    pub fn tick(&mut self) -> TickOutcome {
        let outcome = self.timer.tick();
        match outcome {
            TickOutcome::Counted { remaining } => trace!(remaining, "tick"),
            TickOutcome::Expired => {
                self.grid.end_drag();
                info!(score = self.score(), mode = ?self.mode(), "time up");
            }
            TickOutcome::Ignored => {}
        }
        outcome
    }

    pub fn expire_merge_marks(&mut self, now: Instant) {
        self.grid.expire_merge_marks(now);
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<ModeChange, GameError> {
        let started = self.started();
        let change = self.modes.set_mode(mode, started).inspect_err(|e| {
            debug!(error = %e, "mode change refused");
        })?;
        if let ModeChange::Switched { reshape } = change {
            if started {
                self.timer.clamp_remaining(mode.duration());
            } else {
                self.timer.reset_duration(mode.duration());
            }
            if reshape {
                self.grid.reshape(mode.tile_count(), mode.columns());
            }
            info!(mode = ?mode, reshape, "mode changed");
        }
        Ok(change)
    }

    /// Fresh grid for the current mode, score 0, idle timer, lock cleared.
    pub fn restart(&mut self) {
        let mode = self.mode();
        if self.grid.len() == mode.tile_count() {
            self.grid.reset_values();
        } else {
            self.grid.reshape(mode.tile_count(), mode.columns());
        }
        self.timer.restart(mode.duration());
        self.modes.unlock();
        info!(mode = ?mode, "restarted");
    }
}
