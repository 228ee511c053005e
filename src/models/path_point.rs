use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a sample sits within a stroke.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PathAction {
    Down,
    Move,
    Up,
}

/// One touch sample in surface pixel coordinates.
///
/// Samples between a `Down` and the next `Up` form one stroke, but each one is
/// rasterized on its own; consecutive samples are not interpolated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScratchPathPoint {
    pub x: f32,
    pub y: f32,
    pub action: PathAction,
    pub timestamp: DateTime<Utc>,
}

impl ScratchPathPoint {
    pub fn new(x: f32, y: f32, action: PathAction) -> Self {
        Self::with_timestamp(x, y, action, Utc::now())
    }

    pub fn with_timestamp(x: f32, y: f32, action: PathAction, timestamp: DateTime<Utc>) -> Self {
        Self {
            x,
            y,
            action,
            timestamp,
        }
    }

    pub fn down(x: f32, y: f32) -> Self {
        Self::new(x, y, PathAction::Down)
    }

    pub fn moved(x: f32, y: f32) -> Self {
        Self::new(x, y, PathAction::Move)
    }

    pub fn up(x: f32, y: f32) -> Self {
        Self::new(x, y, PathAction::Up)
    }
}
