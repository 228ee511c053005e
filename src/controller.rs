use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex as StdMutex, MutexGuard, RwLock, Weak,
};

use anyhow::Result;
use log::{debug, error, info};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};

use crate::{
    config::ScratchConfig,
    events::{EventEmitter, ScratchEvent},
    grid::GridSize,
    models::ScratchPathPoint,
    processors::{PathPointQueue, ScratchProcessor, ScratchProgress},
};

/// Callback that sees every sample handed to [`ScratchController::enqueue`].
pub type TouchObserver = Arc<dyn Fn(&ScratchPathPoint) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Host-facing handle tying a surface, the input queue and the scratch
/// processor together.
///
/// Events from the processor are relayed to the receiver returned by
/// [`ScratchController::new`]. Must be created inside a Tokio runtime.
#[derive(Clone)]
pub struct ScratchController {
    config: Arc<RwLock<ScratchConfig>>,
    queue: Arc<PathPointQueue>,
    processor: Arc<Mutex<ScratchProcessor>>,
    available: Arc<AtomicBool>,
    host: EventEmitter,
    observers: Arc<StdMutex<Vec<(ObserverId, TouchObserver)>>>,
    next_observer: Arc<AtomicU64>,
    relay: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ScratchController {
    pub fn new(config: ScratchConfig) -> Result<(Self, mpsc::UnboundedReceiver<ScratchEvent>)> {
        config.validate()?;

        let (host, host_rx) = EventEmitter::channel();
        let (internal, internal_rx) = EventEmitter::channel();

        let queue = Arc::new(PathPointQueue::new());
        let processor = Arc::new(Mutex::new(ScratchProcessor::new(
            Arc::clone(&queue),
            internal,
        )));
        let available = Arc::new(AtomicBool::new(false));

        let relay = tokio::spawn(relay_events(
            internal_rx,
            host.clone(),
            Arc::downgrade(&processor),
            Arc::clone(&available),
        ));

        let controller = Self {
            config: Arc::new(RwLock::new(config)),
            queue,
            processor,
            available,
            host,
            observers: Arc::new(StdMutex::new(Vec::new())),
            next_observer: Arc::new(AtomicU64::new(0)),
            relay: Arc::new(Mutex::new(Some(relay))),
        };

        Ok((controller, host_rx))
    }

    /// Binds to a surface of the given pixel size, discarding any previous
    /// scratch state, and starts processing with the current configuration.
    pub async fn attach(&self, surface_width: u32, surface_height: u32) -> Result<GridSize> {
        let mut processor = self.processor.lock().await;
        self.available.store(false, Ordering::Release);
        processor.stop().await?;

        let grid_size =
            processor.configure(surface_width, surface_height, self.current_config())?;
        self.available.store(true, Ordering::Release);
        processor.start().await?;

        info!(
            "scratch surface attached ({}x{} px, grid {}x{})",
            surface_width, surface_height, grid_size.width, grid_size.height
        );
        Ok(grid_size)
    }

    /// Queues a touch sample. Observers see it either way; the return value is
    /// `false` when the surface is not accepting input (not attached, cleared,
    /// paused or destroyed).
    pub fn enqueue(&self, point: ScratchPathPoint) -> bool {
        self.notify_observers(&point);

        let accepted = self.available.load(Ordering::Acquire) && self.queue.enqueue(point);
        if !accepted {
            debug!("scratch input rejected: surface not accepting points");
        }
        accepted
    }

    pub async fn on_pause(&self) -> Result<()> {
        self.processor.lock().await.stop().await
    }

    pub async fn on_resume(&self) -> Result<()> {
        if !self.available.load(Ordering::Acquire) {
            return Ok(());
        }
        self.processor.lock().await.start().await
    }

    /// Starts over on the attached surface with a clear grid, picking up any
    /// configuration changed since the last attach or reset.
    pub async fn reset(&self) -> Result<()> {
        let mut processor = self.processor.lock().await;
        processor.reset().await?;

        if let Some((surface_width, surface_height)) = processor.surface_size() {
            processor.configure(surface_width, surface_height, self.current_config())?;
            self.available.store(true, Ordering::Release);
            processor.start().await?;
        }
        Ok(())
    }

    /// Stops accepting input and processing, and tells the host to reveal
    /// everything.
    pub async fn clear(&self) -> Result<()> {
        let mut processor = self.processor.lock().await;
        clear_locked(&mut processor, &self.available, &self.host).await
    }

    pub async fn destroy(&self) -> Result<()> {
        self.available.store(false, Ordering::Release);
        let stopped = self.processor.lock().await.stop().await;

        if let Some(relay) = self.relay.lock().await.take() {
            relay.abort();
        }
        stopped
    }

    pub async fn is_active(&self) -> bool {
        self.processor.lock().await.is_active()
    }

    pub async fn grid_size(&self) -> Option<GridSize> {
        self.processor.lock().await.grid_size()
    }

    pub async fn progress(&self) -> ScratchProgress {
        self.processor.lock().await.progress()
    }

    pub async fn is_threshold_reached(&self) -> bool {
        self.progress().await.threshold_reached
    }

    /// Configuration the next `attach` or `reset` will use.
    pub fn config(&self) -> ScratchConfig {
        self.current_config()
    }

    pub fn set_threshold_percent(&self, threshold_percent: f64) -> Result<()> {
        self.update_config(|config| config.threshold_percent = threshold_percent)
    }

    pub fn set_touch_radius_px(&self, touch_radius_px: u32) -> Result<()> {
        self.update_config(|config| config.touch_radius_px = touch_radius_px)
    }

    pub fn set_clear_on_threshold_reached(&self, clear_on_threshold_reached: bool) -> Result<()> {
        self.update_config(|config| config.clear_on_threshold_reached = clear_on_threshold_reached)
    }

    pub fn set_fade_on_clear(&self, fade_on_clear: bool) -> Result<()> {
        self.update_config(|config| config.fade_on_clear = fade_on_clear)
    }

    pub fn add_touch_observer<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&ScratchPathPoint) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        lock_recovering(&self.observers).push((id, Arc::new(observer)));
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn remove_touch_observer(&self, id: ObserverId) -> bool {
        let mut observers = lock_recovering(&self.observers);
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        observers.len() != before
    }

    pub fn remove_touch_observers(&self) {
        lock_recovering(&self.observers).clear();
    }

    fn notify_observers(&self, point: &ScratchPathPoint) {
        // called outside the lock so an observer may add or remove observers
        let observers: Vec<TouchObserver> = {
            let guard = lock_recovering(&self.observers);
            if guard.is_empty() {
                return;
            }
            guard.iter().map(|(_, observer)| Arc::clone(observer)).collect()
        };

        for observer in observers {
            observer(point);
        }
    }

    fn current_config(&self) -> ScratchConfig {
        match self.config.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn update_config(&self, change: impl FnOnce(&mut ScratchConfig)) -> Result<()> {
        let mut guard = match self.config.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut updated = guard.clone();
        change(&mut updated);
        updated.validate()?;
        *guard = updated;
        Ok(())
    }
}

fn lock_recovering<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Marks the surface unavailable and stops processing. The caller holds the
/// processor lock, so no attach or reset can interleave.
async fn clear_locked(
    processor: &mut ScratchProcessor,
    available: &AtomicBool,
    host: &EventEmitter,
) -> Result<()> {
    available.store(false, Ordering::Release);
    let fade = processor.config().is_some_and(|config| config.fade_on_clear);

    let stopped = processor.stop().await;
    host.emit(ScratchEvent::Cleared { fade });
    stopped
}

/// Forwards processor events to the host and clears the surface when the
/// current session crosses its threshold. Ends once the processor is gone.
async fn relay_events(
    mut events: mpsc::UnboundedReceiver<ScratchEvent>,
    host: EventEmitter,
    processor: Weak<Mutex<ScratchProcessor>>,
    available: Arc<AtomicBool>,
) {
    while let Some(event) = events.recv().await {
        let crossed = match &event {
            ScratchEvent::ThresholdReached { session_id } => Some(*session_id),
            _ => None,
        };
        host.emit(event);

        let Some(session_id) = crossed else {
            continue;
        };
        let Some(shared) = processor.upgrade() else {
            break;
        };

        let mut guard = shared.lock().await;
        if guard.session_id() != Some(session_id) {
            debug!("ignoring threshold of replaced session {session_id}");
            continue;
        }
        if !guard
            .config()
            .is_some_and(|config| config.clear_on_threshold_reached)
        {
            continue;
        }

        if let Err(err) = clear_locked(&mut guard, &available, &host).await {
            error!("Failed to stop scratching after threshold: {err:?}");
        }
    }
}
