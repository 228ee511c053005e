use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{
    invalidation::InvalidationProcessor,
    loop_worker::{scratch_loop, BatchContext},
    queue::PathPointQueue,
    session::{ScratchProgress, ScratchSession},
    threshold::ThresholdProcessor,
};
use crate::{config::ScratchConfig, events::EventEmitter, grid::GridSize};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ProcessorStatus {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Surface and tunables a session was configured with.
#[derive(Debug, Clone)]
struct SessionSetup {
    config: ScratchConfig,
    surface_width: u32,
    surface_height: u32,
    grid_size: GridSize,
}

/// Owns the compute task and the session it works on.
///
/// While stopped the session is parked here, so a later `start` continues
/// where the last run left off. Only `configure` and `reset` replace it.
pub struct ScratchProcessor {
    status: ProcessorStatus,
    queue: Arc<PathPointQueue>,
    emitter: EventEmitter,
    setup: Option<SessionSetup>,
    session: Option<ScratchSession>,
    session_id: Option<Uuid>,
    handle: Option<JoinHandle<ScratchSession>>,
    cancel_token: Option<CancellationToken>,
    progress_tx: watch::Sender<ScratchProgress>,
}

impl ScratchProcessor {
    pub fn new(queue: Arc<PathPointQueue>, emitter: EventEmitter) -> Self {
        let (progress_tx, _) = watch::channel(ScratchProgress::default());
        Self {
            status: ProcessorStatus::Stopped,
            queue,
            emitter,
            setup: None,
            session: None,
            session_id: None,
            handle: None,
            cancel_token: None,
            progress_tx,
        }
    }

    /// Sets up a fresh session for a `surface_width x surface_height` pixel
    /// surface. Must happen while stopped.
    pub fn configure(
        &mut self,
        surface_width: u32,
        surface_height: u32,
        config: ScratchConfig,
    ) -> Result<GridSize> {
        if self.handle.is_some() {
            return Err(anyhow!("cannot configure while scratch processing is active"));
        }

        config.validate()?;
        let grid_size = GridSize::for_surface(surface_width, surface_height, config.cell_size_px)?;

        log_info!(
            "configured scratch grid {}x{} for {}x{} surface (radius {}px, threshold {:.2})",
            grid_size.width,
            grid_size.height,
            surface_width,
            surface_height,
            config.touch_radius_px,
            config.threshold_percent
        );

        self.setup = Some(SessionSetup {
            config,
            surface_width,
            surface_height,
            grid_size,
        });
        self.replace_session(grid_size);

        Ok(grid_size)
    }

    pub async fn start(&mut self) -> Result<()> {
        if self.is_active() {
            log_debug!("scratch processor already active, ignoring start");
            return Ok(());
        }

        let setup = self
            .setup
            .clone()
            .context("scratch processor started before configure")?;

        self.status = ProcessorStatus::Starting;

        let session = self
            .session
            .take()
            .unwrap_or_else(|| ScratchSession::new(setup.grid_size));
        let session_id = session.id;
        self.session_id = Some(session_id);

        let ctx = BatchContext {
            cell_size_px: f64::from(setup.config.cell_size_px),
            radius_cells: setup.config.radius_in_cells(),
            threshold: ThresholdProcessor::new(
                session_id,
                setup.config.threshold_percent,
                self.emitter.clone(),
            ),
            invalidation: InvalidationProcessor::new(
                setup.config.cell_size_px,
                setup.surface_width,
                setup.surface_height,
                self.emitter.clone(),
            ),
            progress_tx: self.progress_tx.clone(),
        };

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();

        self.queue.open();
        let handle = tokio::spawn(scratch_loop(
            session,
            Arc::clone(&self.queue),
            ctx,
            token_clone,
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.status = ProcessorStatus::Running;

        log_info!("scratch processing started for session {}", session_id);
        Ok(())
    }

    /// Cancels the compute task and waits until it has processed everything
    /// queued before this call and exited.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            self.status = ProcessorStatus::Stopped;
            return Ok(());
        };

        self.status = ProcessorStatus::Stopping;
        self.queue.close();

        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        let joined = handle.await;
        self.status = ProcessorStatus::Stopped;

        match joined {
            Ok(session) => {
                log_info!("scratch processing stopped for session {}", session.id);
                self.session = Some(session);
                Ok(())
            }
            Err(err) => {
                log_error!("scratch loop ended abnormally: {err}");
                if let Some(setup) = &self.setup {
                    let grid_size = setup.grid_size;
                    self.replace_session(grid_size);
                }
                Err(err).context("scratch loop task failed to join")
            }
        }
    }

    /// Stops processing and discards the session, leaving a clear grid with
    /// the same configuration. Does not restart.
    pub async fn reset(&mut self) -> Result<()> {
        let stopped = self.stop().await;

        self.queue.clear();
        if let Some(setup) = &self.setup {
            let grid_size = setup.grid_size;
            self.replace_session(grid_size);
            log_info!("scratch session reset");
        }

        stopped
    }

    pub fn status(&self) -> ProcessorStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            ProcessorStatus::Starting | ProcessorStatus::Running
        )
    }

    pub fn grid_size(&self) -> Option<GridSize> {
        self.setup.as_ref().map(|setup| setup.grid_size)
    }

    /// Pixel size of the configured surface.
    pub fn surface_size(&self) -> Option<(u32, u32)> {
        self.setup
            .as_ref()
            .map(|setup| (setup.surface_width, setup.surface_height))
    }

    pub fn config(&self) -> Option<&ScratchConfig> {
        self.setup.as_ref().map(|setup| &setup.config)
    }

    /// Id of the session that is running or parked. Changes on every
    /// `configure` and `reset`.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    /// Latest counters published by the compute task, or of the parked session.
    pub fn progress(&self) -> ScratchProgress {
        self.progress_tx.borrow().clone()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<ScratchProgress> {
        self.progress_tx.subscribe()
    }

    pub fn queue(&self) -> &Arc<PathPointQueue> {
        &self.queue
    }

    fn replace_session(&mut self, grid_size: GridSize) {
        let session = ScratchSession::new(grid_size);
        self.progress_tx.send_replace(session.progress());
        self.session_id = Some(session.id);
        self.session = Some(session);
    }
}

impl Drop for ScratchProcessor {
    fn drop(&mut self) {
        self.queue.close();
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}
