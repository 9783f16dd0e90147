//! Exclusive hold on a worker
//!
//! A `Reservation` is the only way to reach a reserved worker. Releasing it
//! runs the worker's `finished_task` exactly once; a reservation dropped
//! without being released schedules that release in the background so the
//! worker always finds its way back to the pool.

use crate::worker::Worker;
use std::ops::Deref;
use std::sync::Arc;

pub struct Reservation {
    worker: Arc<Worker>,
    released: bool,
}

impl Reservation {
    pub(crate) fn new(worker: Arc<Worker>) -> Self {
        Self {
            worker,
            released: false,
        }
    }

    /// The reserved worker
    pub fn worker(&self) -> &Arc<Worker> {
        &self.worker
    }

    /// Hands the worker back: reset, cooldown, then listening
    ///
    /// The hand-back runs on its own task, so dropping this future part-way
    /// through the cooldown still returns the worker.
    pub async fn release(self) {
        let worker = self.disarm();
        let worker_id = worker.id().to_string();
        let handle = tokio::spawn(async move {
            worker.finished_task().await;
        });

        if let Err(e) = handle.await {
            tracing::error!(worker = %worker_id, error = %e, "worker release task failed");
        }
    }

    /// Gives up the guard without releasing the worker
    ///
    /// Used by the pool when a hand-off to a waiting caller fails and the
    /// worker stays under the pool's control.
    pub(crate) fn disarm(mut self) -> Arc<Worker> {
        self.released = true;
        self.worker.clone()
    }
}

impl Deref for Reservation {
    type Target = Worker;

    fn deref(&self) -> &Self::Target {
        &self.worker
    }
}

impl std::fmt::Debug for Reservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reservation")
            .field("worker", &self.worker.id())
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let worker = self.worker.clone();
        tracing::debug!(worker = %worker.id(), "reservation dropped without release");

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    worker.finished_task().await;
                });
            }
            // No runtime left to run the cooldown on; return the worker directly
            Err(_) => worker.notify_listening(),
        }
    }
}
