//! Grid state: tiles, merge rule, drag gesture, merged-flag expiry.

use crate::error::GameError;
use crate::fib::FibonacciOracle;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::debug;

/// How long a freshly merged tile stays flagged.
pub const MERGE_MARK_MS: u64 = 300;

/// Value a tile is created with and reset to after being merged away.
pub const RESET_VALUE: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub id: usize,
    pub value: u64,
}

/// Render attributes for one tile, derived from the engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileView {
    pub id: usize,
    pub value: u64,
    pub row: usize,
    pub col: usize,
    pub is_dragging: bool,
    pub is_valid_target: bool,
    pub is_merged: bool,
}

/// The drag in flight: which tile and which tiles it could merge into.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Drag {
    source: usize,
    valid_targets: BTreeSet<usize>,
}

/// A scheduled merged-flag clear. Only applies if the tile hasn't merged again since.
#[derive(Debug, Clone, Copy)]
struct PendingClear {
    tile: usize,
    generation: u64,
    due: Instant,
}

#[derive(Debug, Clone)]
pub struct GridEngine {
    tiles: Vec<Tile>,
    columns: usize,
    oracle: FibonacciOracle,
    drag: Option<Drag>,
    /// Per-tile merge counter; bumped on every merge into (or out of) the tile.
    generations: Vec<u64>,
    merged: Vec<bool>,
    pending: Vec<PendingClear>,
}

impl GridEngine {
    pub fn new(count: usize, columns: usize) -> Self {
        let mut grid = Self {
            tiles: Vec::new(),
            columns: columns.max(1),
            oracle: FibonacciOracle::new(),
            drag: None,
            generations: Vec::new(),
            merged: Vec::new(),
            pending: Vec::new(),
        };
        grid.reshape(count, columns);
        grid
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.tiles.len().div_ceil(self.columns)
    }

    #[cfg(test)]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    #[cfg(test)]
    pub fn value(&self, id: usize) -> Result<u64, GameError> {
        self.check(id).map(|()| self.tiles[id].value)
    }

    /// Tile currently being dragged, if any.
    pub fn dragging(&self) -> Option<usize> {
        self.drag.as_ref().map(|d| d.source)
    }

    pub fn is_valid_target(&self, id: usize) -> bool {
        self.drag
            .as_ref()
            .is_some_and(|d| d.valid_targets.contains(&id))
    }

    pub fn is_merged(&self, id: usize) -> bool {
        self.merged.get(id).copied().unwrap_or(false)
    }

    #[cfg(test)]
    pub fn total(&self) -> u64 {
        self.tiles.iter().map(|t| t.value).sum()
    }

    fn check(&self, id: usize) -> Result<(), GameError> {
        if id < self.tiles.len() {
            Ok(())
        } else {
            Err(GameError::InvalidTileReference {
                id,
                count: self.tiles.len(),
            })
        }
    }

    /// Keep the oracle ahead of any sum the grid can currently produce.
    fn cover_next_sums(&mut self) {
        let max = self.tiles.iter().map(|t| t.value).max().unwrap_or(RESET_VALUE);
        self.oracle.ensure_covers(max.saturating_mul(2));
    }

    /// Whether merging these two values is legal. An overflowing sum never is.
    pub fn can_merge_values(&mut self, a: u64, b: u64) -> bool {
        a.checked_add(b).is_some_and(|sum| self.oracle.is_fibonacci(sum))
    }

    /// Start dragging `source` and mark every tile it could merge into.
    /// Beginning the same drag twice is a no-op; beginning another is rejected.
    pub fn begin_drag(&mut self, source: usize) -> Result<(), GameError> {
        self.check(source)?;
        if let Some(drag) = &self.drag {
            if drag.source == source {
                return Ok(());
            }
            return Err(GameError::DragInProgress {
                dragging: drag.source,
            });
        }
        let source_value = self.tiles[source].value;
        let candidates: Vec<(usize, u64)> = self
            .tiles
            .iter()
            .filter(|t| t.id != source)
            .map(|t| (t.id, t.value))
            .collect();
        let valid_targets = candidates
            .into_iter()
            .filter(|&(_, value)| self.can_merge_values(source_value, value))
            .map(|(id, _)| id)
            .collect::<BTreeSet<_>>();
        debug!(source, targets = valid_targets.len(), "drag started");
        self.drag = Some(Drag {
            source,
            valid_targets,
        });
        Ok(())
    }

    /// Merge `source` into `target`, checked against live values (not the
    /// valid-target marks, which may be stale). Returns the new target value.
    pub fn attempt_merge(
        &mut self,
        source: usize,
        target: usize,
        now: Instant,
    ) -> Result<u64, GameError> {
        self.check(source)?;
        self.check(target)?;
        let (a, b) = (self.tiles[source].value, self.tiles[target].value);
        let rejected = GameError::InvalidMergeAttempt {
            dragged: source,
            target,
            dragged_value: a,
            target_value: b,
        };
        if source == target || !self.can_merge_values(a, b) {
            return Err(rejected);
        }
        let sum = a + b;

        self.tiles[target].value = sum;
        self.tiles[source].value = RESET_VALUE;

        if let Some(drag) = &mut self.drag {
            drag.valid_targets.remove(&target);
            drag.valid_targets.remove(&source);
        }
        if self.dragging() == Some(source) {
            self.drag = None;
        }

        // Source loses any pending merged flag; its scheduled clear becomes stale.
        self.generations[source] += 1;
        self.merged[source] = false;

        self.generations[target] += 1;
        self.merged[target] = true;
        self.pending.push(PendingClear {
            tile: target,
            generation: self.generations[target],
            due: now + Duration::from_millis(MERGE_MARK_MS),
        });

        self.cover_next_sums();
        Ok(sum)
    }

    /// Drop or cancel: clear all drag state.
    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Apply every scheduled merged-flag clear that is due by `now`.
    pub fn expire_merge_marks(&mut self, now: Instant) {
        let generations = &self.generations;
        let merged = &mut self.merged;
        self.pending.retain(|p| {
            if p.due > now {
                return true;
            }
            if generations.get(p.tile) == Some(&p.generation) {
                merged[p.tile] = false;
            }
            false
        });
    }

    /// Earliest pending clear, so the host can wake up for it.
    pub fn next_mark_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|p| p.due).min()
    }

    /// Fresh tiles `0..count`, all ones, no transient state.
    pub fn reshape(&mut self, count: usize, columns: usize) {
        self.tiles = (0..count)
            .map(|id| Tile {
                id,
                value: RESET_VALUE,
            })
            .collect();
        self.columns = columns.max(1);
        self.drag = None;
        self.generations = vec![0; count];
        self.merged = vec![false; count];
        self.pending.clear();
        self.cover_next_sums();
    }

    /// All values back to one, keeping the shape.
    pub fn reset_values(&mut self) {
        let (count, columns) = (self.tiles.len(), self.columns);
        self.reshape(count, columns);
    }

    /// Whether any two tiles can currently merge.
    pub fn has_legal_merge(&mut self) -> bool {
        let values: Vec<u64> = self.tiles.iter().map(|t| t.value).collect();
        for (i, &a) in values.iter().enumerate() {
            for &b in &values[i + 1..] {
                if self.can_merge_values(a, b) {
                    return true;
                }
            }
        }
        false
    }

    pub fn view(&self) -> Vec<TileView> {
        let dragging = self.dragging();
        self.tiles
            .iter()
            .map(|t| TileView {
                id: t.id,
                value: t.value,
                row: t.id / self.columns,
                col: t.id % self.columns,
                is_dragging: dragging == Some(t.id),
                is_valid_target: self.is_valid_target(t.id),
                is_merged: self.is_merged(t.id),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid_with(values: &[u64]) -> GridEngine {
        let mut g = GridEngine::new(values.len(), 4);
        for (t, v) in g.tiles.iter_mut().zip(values) {
            t.value = *v;
        }
        g.cover_next_sums();
        g
    }

    const FIBS: [u64; 12] = [1, 2, 3, 5, 8, 13, 21, 34, 55, 89, 144, 233];

    #[test]
    fn test_new_grid_is_all_ones() {
        let g = GridEngine::new(16, 4);
        assert_eq!(g.len(), 16);
        assert_eq!(g.rows(), 4);
        assert!(g.tiles().iter().enumerate().all(|(i, t)| t.id == i && t.value == 1));
    }

    #[test]
    fn test_merge_examples() {
        let now = Instant::now();
        // 1+1=2, 2+3=5, 2+2=4, 3+5=8
        let mut g = grid_with(&[1, 1, 2, 3, 2, 2, 3, 5]);
        assert_eq!(g.attempt_merge(0, 1, now), Ok(2));
        assert_eq!(g.attempt_merge(2, 3, now), Ok(5));
        assert!(matches!(
            g.attempt_merge(4, 5, now),
            Err(GameError::InvalidMergeAttempt { .. })
        ));
        assert_eq!(g.attempt_merge(6, 7, now), Ok(8));
    }

    #[test]
    fn test_merge_updates_source_and_target() {
        let now = Instant::now();
        let mut g = grid_with(&[2, 3, 1, 1]);
        assert_eq!(g.attempt_merge(0, 1, now), Ok(5));
        assert_eq!(g.value(0), Ok(1));
        assert_eq!(g.value(1), Ok(5));
        assert!(g.is_merged(1));
        assert!(!g.is_merged(0));
    }

    #[test]
    fn test_rejected_merge_leaves_grid_untouched() {
        let now = Instant::now();
        let mut g = grid_with(&[2, 2, 1, 1]);
        let before = g.tiles().to_vec();
        assert!(g.attempt_merge(0, 1, now).is_err());
        assert_eq!(g.tiles(), &before[..]);
        assert!(!g.is_merged(1));
        assert_eq!(g.next_mark_deadline(), None);
    }

    #[test]
    fn test_self_merge_rejected() {
        let mut g = GridEngine::new(4, 2);
        assert!(matches!(
            g.attempt_merge(2, 2, Instant::now()),
            Err(GameError::InvalidMergeAttempt { .. })
        ));
    }

    #[test]
    fn test_out_of_range_ids() {
        let mut g = GridEngine::new(9, 3);
        assert_eq!(
            g.begin_drag(9),
            Err(GameError::InvalidTileReference { id: 9, count: 9 })
        );
        assert!(matches!(
            g.attempt_merge(0, 12, Instant::now()),
            Err(GameError::InvalidTileReference { id: 12, .. })
        ));
    }

    #[test]
    fn test_begin_drag_marks_valid_targets() {
        let mut g = grid_with(&[1, 2, 3, 1, 5, 8]);
        g.begin_drag(1).unwrap();
        let view = g.view();
        assert!(view[1].is_dragging);
        assert!(!view[1].is_valid_target);
        // 2+1=3 and 2+3=5 are legal; 2+5=7 and 2+8=10 are not.
        let marked: Vec<usize> = view.iter().filter(|t| t.is_valid_target).map(|t| t.id).collect();
        assert_eq!(marked, vec![0, 2, 3]);
    }

    #[test]
    fn test_second_drag_rejected_same_drag_noop() {
        let mut g = GridEngine::new(4, 2);
        g.begin_drag(1).unwrap();
        assert_eq!(g.begin_drag(1), Ok(()));
        assert_eq!(g.begin_drag(2), Err(GameError::DragInProgress { dragging: 1 }));
        assert_eq!(g.dragging(), Some(1));
    }

    #[test]
    fn test_end_drag_clears_everything() {
        let mut g = GridEngine::new(4, 2);
        g.begin_drag(0).unwrap();
        g.end_drag();
        assert!(g.view().iter().all(|t| !t.is_dragging && !t.is_valid_target));
    }

    #[test]
    fn test_merge_validated_against_live_values() {
        let now = Instant::now();
        let mut g = grid_with(&[2, 1, 2, 1]);
        g.begin_drag(0).unwrap();
        assert!(!g.is_valid_target(2));
        // Another input changes tile 2 under the drag; the merge uses live values.
        assert_eq!(g.attempt_merge(3, 2, now), Ok(3));
        assert!(!g.is_valid_target(2));
        assert_eq!(g.attempt_merge(0, 2, now), Ok(5));
    }

    #[test]
    fn test_merge_from_drag_source_ends_drag() {
        let mut g = GridEngine::new(4, 2);
        g.begin_drag(0).unwrap();
        g.attempt_merge(0, 1, Instant::now()).unwrap();
        assert_eq!(g.dragging(), None);
        assert!(!g.is_valid_target(1));
    }

    #[test]
    fn test_merged_flag_expires() {
        let t0 = Instant::now();
        let mut g = GridEngine::new(4, 2);
        g.attempt_merge(0, 1, t0).unwrap();
        g.expire_merge_marks(t0 + Duration::from_millis(MERGE_MARK_MS - 1));
        assert!(g.is_merged(1));
        g.expire_merge_marks(t0 + Duration::from_millis(MERGE_MARK_MS));
        assert!(!g.is_merged(1));
        assert_eq!(g.next_mark_deadline(), None);
    }

    #[test]
    fn test_stale_clear_does_not_clear_newer_merge() {
        let t0 = Instant::now();
        let mut g = GridEngine::new(4, 2);
        g.attempt_merge(0, 1, t0).unwrap(); // tile 1 = 2
        let t1 = t0 + Duration::from_millis(200);
        g.attempt_merge(2, 3, t1).unwrap(); // tile 3 = 2
        g.attempt_merge(0, 1, t1).unwrap(); // tile 1 = 3, merged again
        // The first clear is due now but belongs to the older merge.
        g.expire_merge_marks(t0 + Duration::from_millis(MERGE_MARK_MS));
        assert!(g.is_merged(1));
        g.expire_merge_marks(t1 + Duration::from_millis(MERGE_MARK_MS));
        assert!(!g.is_merged(1));
        assert!(!g.is_merged(3));
    }

    #[test]
    fn test_merged_away_source_loses_flag() {
        let t0 = Instant::now();
        let mut g = GridEngine::new(4, 2);
        g.attempt_merge(0, 1, t0).unwrap();
        g.attempt_merge(2, 3, t0).unwrap();
        // 2 + 1 = 3: the previously merged tile becomes the source.
        g.attempt_merge(1, 0, t0).unwrap();
        assert!(!g.is_merged(1));
        assert!(g.is_merged(0));
        assert_eq!(g.value(0), Ok(3));
    }

    #[test]
    fn test_reshape_resets_everything() {
        let t0 = Instant::now();
        let mut g = GridEngine::new(16, 4);
        g.attempt_merge(0, 1, t0).unwrap();
        g.begin_drag(2).unwrap();
        g.reshape(9, 3);
        assert_eq!(g.len(), 9);
        assert_eq!(g.columns(), 3);
        assert_eq!(g.dragging(), None);
        assert_eq!(g.next_mark_deadline(), None);
        let view = g.view();
        assert_eq!((view[4].row, view[4].col), (1, 1));
        assert!(view.iter().all(|t| t.value == 1 && !t.is_merged));
    }

    #[test]
    fn test_has_legal_merge() {
        let mut g = grid_with(&[2, 2]);
        assert!(!g.has_legal_merge());
        let mut g = grid_with(&[4, 4, 1]);
        assert!(g.has_legal_merge());
    }

    proptest! {
        #[test]
        fn merge_legal_iff_sum_is_fibonacci(a in 1u64..2_000, b in 1u64..2_000) {
            let mut g = grid_with(&[a, b]);
            let is_fib = FibonacciOracle::covering(a + b).contains(a + b);
            prop_assert_eq!(g.attempt_merge(0, 1, Instant::now()).is_ok(), is_fib);
        }

        #[test]
        fn merge_moves_value_into_target(i in 0usize..12, j in 0usize..12) {
            let mut g = grid_with(&[FIBS[i], FIBS[j], 1, 1]);
            let before = g.total();
            if let Ok(sum) = g.attempt_merge(0, 1, Instant::now()) {
                prop_assert_eq!(sum, FIBS[i] + FIBS[j]);
                prop_assert_eq!(g.value(0), Ok(1));
                prop_assert_eq!(g.value(1), Ok(sum));
                // Target gains the source's value; the source drops back to 1.
                prop_assert_eq!(g.total(), before + 1);
            } else {
                prop_assert_eq!(g.total(), before);
            }
        }

        #[test]
        fn drag_marks_exactly_legal_partners(idx in prop::collection::vec(0usize..12, 2..16), src in 0usize..16) {
            let values: Vec<u64> = idx.iter().map(|&i| FIBS[i]).collect();
            let src = src % values.len();
            let mut g = grid_with(&values);
            g.begin_drag(src).unwrap();
            let oracle = FibonacciOracle::covering(1_000);
            for t in g.view() {
                let expected = t.id != src && oracle.contains(values[src] + t.value);
                prop_assert_eq!(t.is_valid_target, expected);
            }
        }
    }
}
