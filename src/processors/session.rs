use serde::Serialize;
use uuid::Uuid;

use crate::grid::{CoverageGrid, GridSize};

/// Everything one scratch session owns. Lives inside the compute task while it
/// runs and is handed back to the processor when the task stops.
#[derive(Debug, Clone)]
pub struct ScratchSession {
    pub id: Uuid,
    pub grid: CoverageGrid,
    pub state: SessionState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Latched once the threshold is crossed; only a new session clears it.
    pub threshold_reached: bool,
    pub points_processed: u64,
    pub batches_processed: u64,
}

impl ScratchSession {
    pub fn new(size: GridSize) -> Self {
        Self {
            id: Uuid::new_v4(),
            grid: CoverageGrid::new(size),
            state: SessionState::default(),
        }
    }

    pub fn progress(&self) -> ScratchProgress {
        ScratchProgress {
            scratched_cells: self.grid.marked_count(),
            total_cells: self.grid.cell_count(),
            percent: scratched_percent(self.grid.marked_count(), self.grid.cell_count()),
            threshold_reached: self.state.threshold_reached,
            points_processed: self.state.points_processed,
            batches_processed: self.state.batches_processed,
        }
    }
}

/// Copy of a session's counters, safe to hand to any thread.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScratchProgress {
    pub scratched_cells: usize,
    pub total_cells: usize,
    pub percent: f64,
    pub threshold_reached: bool,
    pub points_processed: u64,
    pub batches_processed: u64,
}

/// Share of `total` covered by `marked`, in `[0, 100]`.
pub fn scratched_percent(marked: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (marked as f64 * 100.0 / total as f64).clamp(0.0, 100.0)
}
