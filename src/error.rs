//! Rejections reported by the engine. None of them end the session.

use crate::mode::Mode;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GameError {
    /// Sum is not a Fibonacci number, or a tile was dropped on itself.
    #[error("merge rejected: tile {dragged} ({dragged_value}) onto tile {target} ({target_value})")]
    InvalidMergeAttempt {
        dragged: usize,
        target: usize,
        dragged_value: u64,
        target_value: u64,
    },

    #[error("mode switch {from:?} -> {to:?} not allowed once the run has started")]
    IllegalModeTransition { from: Mode, to: Mode },

    /// Usually a stale id kept across a reshape.
    #[error("tile {id} does not exist (grid has {count} tiles)")]
    InvalidTileReference { id: usize, count: usize },

    #[error("game over: gestures are ignored until restart")]
    GestureWhileOver,

    #[error("tile {dragging} is already being dragged")]
    DragInProgress { dragging: usize },

    #[error("no drag in progress")]
    NoActiveDrag,
}
