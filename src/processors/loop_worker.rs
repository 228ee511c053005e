use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{
    invalidation::InvalidationProcessor, queue::PathPointQueue, session::ScratchProgress,
    session::ScratchSession, threshold::ThresholdProcessor,
};
use crate::models::ScratchPathPoint;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// What the compute task needs besides the session it owns.
pub struct BatchContext {
    pub cell_size_px: f64,
    pub radius_cells: f64,
    pub threshold: ThresholdProcessor,
    pub invalidation: InvalidationProcessor,
    pub progress_tx: watch::Sender<ScratchProgress>,
}

/// Compute task body. Drains the queue until cancelled, then processes
/// whatever was queued before the queue closed and hands the session back.
pub async fn scratch_loop(
    mut session: ScratchSession,
    queue: Arc<PathPointQueue>,
    ctx: BatchContext,
    cancel_token: CancellationToken,
) -> ScratchSession {
    log_info!("scratch loop started for session {}", session.id);

    loop {
        let points = queue.drain();
        if !points.is_empty() {
            process_batch(&mut session, &points, &ctx);
            // input handling takes priority over batches
            tokio::task::yield_now().await;
            continue;
        }

        tokio::select! {
            _ = queue.notified() => {}
            _ = cancel_token.cancelled() => {
                let remaining = queue.drain();
                if !remaining.is_empty() {
                    process_batch(&mut session, &remaining, &ctx);
                }
                log_info!(
                    "scratch loop shutting down for session {} ({} points, {} batches)",
                    session.id,
                    session.state.points_processed,
                    session.state.batches_processed
                );
                break;
            }
        }
    }

    session
}

/// Rasterizes one batch and notifies downstream if it scratched anything new.
/// Runs to completion without yielding, so cancellation never observes a
/// half-marked disc. Returns the number of newly marked cells.
pub fn process_batch(
    session: &mut ScratchSession,
    points: &[ScratchPathPoint],
    ctx: &BatchContext,
) -> usize {
    let mut newly_marked = Vec::new();

    for point in points {
        session.grid.mark_disc(
            f64::from(point.x) / ctx.cell_size_px,
            f64::from(point.y) / ctx.cell_size_px,
            ctx.radius_cells,
            &mut newly_marked,
        );
    }

    session.state.points_processed += points.len() as u64;
    session.state.batches_processed += 1;

    if !newly_marked.is_empty() {
        ctx.threshold.on_cells_marked(
            newly_marked.len(),
            session.grid.marked_count(),
            session.grid.cell_count(),
            &mut session.state.threshold_reached,
        );
        ctx.invalidation.on_cells_marked(&newly_marked, points);
    } else {
        log_debug!("batch of {} points scratched no new cells", points.len());
    }

    ctx.progress_tx.send_replace(session.progress());

    newly_marked.len()
}
