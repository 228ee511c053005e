use uuid::Uuid;

use crate::events::{EventEmitter, ScratchEvent};

use super::session::scratched_percent;

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Result of one threshold check, mainly for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdUpdate {
    pub percent: f64,
    /// True only for the batch that crossed the threshold.
    pub crossed: bool,
}

/// Turns grid counters into percent-changed and threshold-reached events.
///
/// Batches arrive one at a time from the compute task, so checking and
/// latching need no locking of their own.
#[derive(Debug, Clone)]
pub struct ThresholdProcessor {
    session_id: Uuid,
    threshold_percent: f64,
    emitter: EventEmitter,
}

impl ThresholdProcessor {
    pub fn new(session_id: Uuid, threshold_percent: f64, emitter: EventEmitter) -> Self {
        Self {
            session_id,
            threshold_percent,
            emitter,
        }
    }

    /// Handles one batch. `threshold_reached` is the session latch; it flips to
    /// true at most once and is never cleared here.
    pub fn on_cells_marked(
        &self,
        newly_marked: usize,
        total_marked: usize,
        total_cells: usize,
        threshold_reached: &mut bool,
    ) -> Option<ThresholdUpdate> {
        if newly_marked == 0 {
            return None;
        }

        let percent = scratched_percent(total_marked, total_cells);
        self.emitter.emit(ScratchEvent::PercentChanged { percent });

        // compare on the raw ratio, percent is rounded through a multiply
        let ratio = if total_cells == 0 {
            0.0
        } else {
            total_marked as f64 / total_cells as f64
        };

        let crossed = !*threshold_reached && ratio >= self.threshold_percent;
        if crossed {
            *threshold_reached = true;
            log_info!(
                "scratch threshold {:.2} reached at {:.2}% in session {}",
                self.threshold_percent,
                percent,
                self.session_id
            );
            self.emitter.emit(ScratchEvent::ThresholdReached {
                session_id: self.session_id,
            });
        }

        Some(ThresholdUpdate { percent, crossed })
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;

    fn processor(threshold: f64) -> (ThresholdProcessor, UnboundedReceiver<ScratchEvent>) {
        let (emitter, rx) = EventEmitter::channel();
        (ThresholdProcessor::new(Uuid::new_v4(), threshold, emitter), rx)
    }

    fn collect(rx: &mut UnboundedReceiver<ScratchEvent>) -> Vec<ScratchEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn no_new_cells_emits_nothing() {
        let (processor, mut rx) = processor(0.5);
        let mut latch = false;

        assert_eq!(processor.on_cells_marked(0, 10, 100, &mut latch), None);
        assert!(collect(&mut rx).is_empty());
    }

    #[test]
    fn below_threshold_only_reports_percent() {
        let (processor, mut rx) = processor(0.5);
        let mut latch = false;

        let update = processor.on_cells_marked(1, 49, 100, &mut latch).unwrap();
        assert_eq!(update.percent, 49.0);
        assert!(!update.crossed);
        assert!(!latch);
        assert_eq!(
            collect(&mut rx),
            vec![ScratchEvent::PercentChanged { percent: 49.0 }]
        );
    }

    fn is_threshold(event: &ScratchEvent) -> bool {
        matches!(event, ScratchEvent::ThresholdReached { .. })
    }

    #[test]
    fn crossing_fires_once() {
        let session_id = Uuid::new_v4();
        let (emitter, mut rx) = EventEmitter::channel();
        let processor = ThresholdProcessor::new(session_id, 0.5, emitter);
        let mut latch = false;

        let update = processor.on_cells_marked(1, 50, 100, &mut latch).unwrap();
        assert!(update.crossed);
        assert!(latch);

        let update = processor.on_cells_marked(10, 60, 100, &mut latch).unwrap();
        assert!(!update.crossed);

        assert_eq!(
            collect(&mut rx),
            vec![
                ScratchEvent::PercentChanged { percent: 50.0 },
                ScratchEvent::ThresholdReached { session_id },
                ScratchEvent::PercentChanged { percent: 60.0 },
            ]
        );
    }

    #[test]
    fn full_threshold_needs_every_cell() {
        let (processor, mut rx) = processor(1.0);
        let mut latch = false;

        processor.on_cells_marked(2, 2, 3, &mut latch);
        assert!(!latch);
        processor.on_cells_marked(1, 3, 3, &mut latch);
        assert!(latch);

        let thresholds = collect(&mut rx)
            .into_iter()
            .filter(is_threshold)
            .count();
        assert_eq!(thresholds, 1);
    }

    #[test]
    fn latched_session_stays_latched() {
        let (processor, mut rx) = processor(0.1);
        let mut latch = true;

        let update = processor.on_cells_marked(5, 90, 100, &mut latch).unwrap();
        assert!(!update.crossed);
        assert!(!collect(&mut rx).iter().any(is_threshold));
    }
}
