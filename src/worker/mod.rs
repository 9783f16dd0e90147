//! Workers: reusable execution slots bound to one identity
//!
//! This module contains:
//! - The worker status state machine
//! - The execution context trait and its HTTP (and optional browser) implementations
//! - The `Worker` itself, which reports task completion back to its pool

#[cfg(feature = "browser")]
mod browser;
mod context;
mod http;
mod state;
#[cfg(test)]
pub(crate) mod test_support;

#[cfg(feature = "browser")]
pub use browser::{BrowserContext, BrowserContextFactory};
pub use context::{ContextFactory, ExecutionContext, Navigation};
pub use http::{build_http_client, HttpContext, HttpContextFactory};
pub use state::WorkerStatus;

use crate::config::RuntimeKind;
use crate::identity::IdentityRegistry;
use crate::Result;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

/// Length of generated worker ids
const WORKER_ID_LEN: usize = 21;

/// Generates a random worker id
pub fn generate_worker_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(WORKER_ID_LEN)
        .map(char::from)
        .collect()
}

/// Messages a worker sends to the pool that owns it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessage {
    /// The worker finished its task and served its cooldown
    Listening { worker_id: String },
}

pub(crate) type WorkerNotifier = mpsc::UnboundedSender<WorkerMessage>;

/// One reusable execution context bound to one identity
pub struct Worker {
    id: String,
    identity: String,
    context: Box<dyn ExecutionContext>,
    cooldown: Duration,
    registry: Arc<IdentityRegistry>,
    notifier: WorkerNotifier,
    tasks_finished: AtomicU64,
}

impl Worker {
    pub(crate) fn new(
        id: String,
        identity: String,
        context: Box<dyn ExecutionContext>,
        cooldown: Duration,
        registry: Arc<IdentityRegistry>,
        notifier: WorkerNotifier,
    ) -> Self {
        Self {
            id,
            identity,
            context,
            cooldown,
            registry,
            notifier,
            tasks_finished: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The identity this worker tags its requests with
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Minimum idle time between finishing a task and accepting the next
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn kind(&self) -> RuntimeKind {
        self.context.kind()
    }

    /// Number of times `finished_task` has completed
    pub fn tasks_finished(&self) -> u64 {
        self.tasks_finished.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.context.is_closed()
    }

    /// Issues one navigation through the execution context
    pub async fn navigate(&self, url: &Url) -> Result<crate::worker::Navigation> {
        self.context.navigate(url).await
    }

    /// Returns the worker to its pool
    ///
    /// Resets the execution context, waits out the cooldown, then tells the
    /// pool the worker is listening again. A failed reset is logged and does
    /// not keep the worker out of the pool.
    pub async fn finished_task(&self) {
        if !self.context.is_closed() {
            if let Err(e) = self.context.reset().await {
                tracing::warn!(worker = %self.id, error = %e, "failed to reset execution context");
            }
        }

        if !self.cooldown.is_zero() {
            tokio::time::sleep(self.cooldown).await;
        }

        self.tasks_finished.fetch_add(1, Ordering::SeqCst);
        self.notify_listening();
    }

    /// Sends the listening message without reset or cooldown
    pub(crate) fn notify_listening(&self) {
        let message = WorkerMessage::Listening {
            worker_id: self.id.clone(),
        };
        if self.notifier.send(message).is_err() {
            tracing::trace!(worker = %self.id, "pool no longer listening for worker messages");
        }
    }

    /// Releases the identity and closes the execution context
    ///
    /// Returns whether an identity was still registered for this worker.
    pub async fn stop(&self) -> bool {
        let had_identity = self.registry.clear(&self.id);

        if !self.context.is_closed() {
            if let Err(e) = self.context.close().await {
                tracing::warn!(worker = %self.id, error = %e, "failed to close execution context");
            }
        }

        had_identity
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("cooldown", &self.cooldown)
            .field("tasks_finished", &self.tasks_finished())
            .finish()
    }
}
