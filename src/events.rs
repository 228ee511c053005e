use log::debug;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::ScratchPathPoint;

/// A rectangle of the host surface, in pixels, that needs redrawing.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Notifications posted from the compute task to the host.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ScratchEvent {
    /// Points of a batch that scratched at least one new cell, for hosts that
    /// paint the exact erase shapes.
    NewScratchedPoints { points: Vec<ScratchPathPoint> },
    /// Scratched share of the grid in `[0, 100]`.
    PercentChanged { percent: f64 },
    /// Fired once per session. `session_id` names the session that crossed,
    /// which may have been reset by the time the host sees it.
    ThresholdReached { session_id: Uuid },
    InvalidateRegions { regions: Vec<Region> },
    /// The surface was cleared and stopped accepting input. `fade` asks the
    /// host to animate the reveal instead of dropping the overlay at once.
    Cleared { fade: bool },
}

impl ScratchEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ScratchEvent::NewScratchedPoints { .. } => "scratch-new-points",
            ScratchEvent::PercentChanged { .. } => "scratch-percent-changed",
            ScratchEvent::ThresholdReached { .. } => "scratch-threshold-reached",
            ScratchEvent::InvalidateRegions { .. } => "scratch-invalidate",
            ScratchEvent::Cleared { .. } => "scratch-cleared",
        }
    }
}

/// Sending half of the event channel. Emitting never waits on the receiver.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: mpsc::UnboundedSender<ScratchEvent>,
}

impl EventEmitter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ScratchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: ScratchEvent) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            debug!("dropping {name}: event receiver closed");
        }
    }
}
