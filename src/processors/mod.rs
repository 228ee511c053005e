pub mod invalidation;
pub mod loop_worker;
pub mod queue;
pub mod scratch;
pub mod session;
pub mod threshold;

pub use invalidation::{coalesce_cells, CellRect, InvalidationProcessor};
pub use queue::PathPointQueue;
pub use scratch::{ProcessorStatus, ScratchProcessor};
pub use session::{ScratchProgress, ScratchSession, SessionState};
pub use threshold::{ThresholdProcessor, ThresholdUpdate};
