//! Scratch-off reveal engine.
//!
//! Touch samples go into a [`PathPointQueue`] on the input side. A background
//! compute task owned by [`ScratchProcessor`] drains them, marks discs on a
//! [`CoverageGrid`], and reports percent scratched, the one-time threshold
//! crossing and the surface regions to redraw as [`ScratchEvent`]s.
//! [`ScratchController`] wraps all of it for a host surface.

pub mod config;
pub mod controller;
pub mod events;
pub mod grid;
pub mod models;
pub mod processors;
pub mod utils;

pub use config::{ConfigError, ScratchConfig};
pub use controller::{ObserverId, ScratchController, TouchObserver};
pub use events::{EventEmitter, Region, ScratchEvent};
pub use grid::{CoverageGrid, GridCell, GridSize};
pub use models::{PathAction, ScratchPathPoint};
pub use processors::{
    PathPointQueue, ProcessorStatus, ScratchProcessor, ScratchProgress, ScratchSession,
};

/// Initializes `env_logger` from `RUST_LOG`, defaulting to `info`.
/// Later calls, or a logger installed by the host, are left alone.
pub fn init_logging() {
    let initialized = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init()
        .is_ok();

    if initialized {
        log::info!("scratchoff logging initialized");
    }
}
