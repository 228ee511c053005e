use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard,
    },
};

use tokio::sync::Notify;

use crate::models::ScratchPathPoint;

/// Ordered hand-off of touch samples from the input side to the compute task.
///
/// One producer enqueues, one consumer drains. The buffer is unbounded: touch
/// sampling rates keep it small, and dropping samples would lose scratches.
/// While closed, `enqueue` rejects samples instead of buffering them.
#[derive(Debug, Default)]
pub struct PathPointQueue {
    points: Mutex<VecDeque<ScratchPathPoint>>,
    open: AtomicBool,
    ready: Notify,
}

impl PathPointQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample. Returns `false` if the queue is closed.
    pub fn enqueue(&self, point: ScratchPathPoint) -> bool {
        {
            let mut points = self.lock();
            // checked under the lock so a concurrent close cannot strand a sample
            if !self.open.load(Ordering::Acquire) {
                return false;
            }
            points.push_back(point);
        }

        self.ready.notify_one();
        true
    }

    /// Removes and returns everything queued so far, oldest first.
    pub fn drain(&self) -> Vec<ScratchPathPoint> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub(crate) fn open(&self) {
        let _points = self.lock();
        self.open.store(true, Ordering::Release);
    }

    /// Stops accepting samples. Already queued samples stay for the consumer.
    pub(crate) fn close(&self) {
        let _points = self.lock();
        self.open.store(false, Ordering::Release);
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    /// Resolves once a sample has been enqueued since the last wakeup.
    pub(crate) async fn notified(&self) {
        self.ready.notified().await;
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ScratchPathPoint>> {
        // samples are plain data, a poisoned buffer is still consistent
        match self.points.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
