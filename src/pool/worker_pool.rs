//! Fixed-size worker pool with a FIFO reservation queue
//!
//! Every status change and every queue mutation happens under one lock, so
//! concurrent `request_worker` calls and concurrent listening notifications
//! can never reserve the same worker twice or skip a queued caller.
//!
//! Workers report task completion over an mpsc channel owned by the pool. A
//! dispatcher task drains that channel and applies the queue-drain rule: the
//! longest-waiting caller receives the freed worker; with nobody waiting the
//! worker goes back to `Listening`.

use crate::config::RuntimeKind;
use crate::identity::IdentityRegistry;
use crate::pool::events::PoolEvent;
use crate::pool::reservation::Reservation;
use crate::worker::{generate_worker_id, ContextFactory, Worker, WorkerMessage, WorkerStatus};
use crate::{HarvestError, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Capacity of the lifecycle event channel; slow subscribers lag, they never block the pool
const EVENT_CAPACITY: usize = 256;

/// Sizing and pacing of a pool
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Number of workers, at least 1
    pub concurrency: usize,
    /// Cooldown each worker serves after a task
    pub cooldown: Duration,
    /// How long `request_worker` may wait in the queue (`None` = forever)
    pub acquire_timeout: Option<Duration>,
    /// Event channel to publish on; subscribe to it before `initialize` to
    /// see the startup events
    pub events: Option<broadcast::Sender<PoolEvent>>,
}

impl PoolSettings {
    pub fn new(concurrency: usize, cooldown: Duration) -> Self {
        Self {
            concurrency,
            cooldown,
            acquire_timeout: None,
            events: None,
        }
    }

    pub fn with_events(mut self, events: broadcast::Sender<PoolEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

type Waiter = oneshot::Sender<Result<Reservation>>;

struct WorkerEntry {
    worker: Arc<Worker>,
    status: WorkerStatus,
}

struct PoolState {
    workers: HashMap<String, WorkerEntry>,
    /// Creation order; reservation scans follow it
    order: Vec<String>,
    waiters: VecDeque<Waiter>,
    closed: bool,
}

impl PoolState {
    fn set_status(&mut self, worker_id: &str, next: WorkerStatus) -> bool {
        match self.workers.get_mut(worker_id) {
            Some(entry) if entry.status.can_transition_to(next) => {
                entry.status = next;
                true
            }
            _ => false,
        }
    }

    /// Marks the first listening worker as reserved
    fn reserve_first_listening(&mut self) -> Option<Arc<Worker>> {
        let worker_id = self
            .order
            .iter()
            .find(|id| {
                self.workers
                    .get(*id)
                    .map(|entry| entry.status.is_available())
                    .unwrap_or(false)
            })?
            .clone();

        let entry = self.workers.get_mut(&worker_id)?;
        entry.status = WorkerStatus::Reserved;
        Some(entry.worker.clone())
    }

    fn count(&self, status: WorkerStatus) -> usize {
        self.workers
            .values()
            .filter(|entry| entry.status == status)
            .count()
    }
}

struct PoolShared {
    state: Mutex<PoolState>,
    events: broadcast::Sender<PoolEvent>,
    shutdown: CancellationToken,
    factory: Arc<dyn ContextFactory>,
    registry: Arc<IdentityRegistry>,
    acquire_timeout: Option<Duration>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl PoolShared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // Every mutation leaves the state consistent before it can panic
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: PoolEvent) {
        tracing::trace!(event = %event, "pool event");
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Queue-drain rule, run for every listening notification
    fn handle_listening(&self, worker_id: &str) {
        let mut state = self.lock();
        if state.closed {
            return;
        }

        let worker = match state.workers.get(worker_id) {
            Some(entry) if entry.status == WorkerStatus::Reserved => entry.worker.clone(),
            Some(entry) => {
                tracing::warn!(
                    worker = %worker_id,
                    status = %entry.status,
                    "ignoring listening notification for worker that is not reserved"
                );
                return;
            }
            None => return,
        };

        self.emit(PoolEvent::Listening(worker_id.to_string()));

        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.is_closed() {
                tracing::trace!("skipping cancelled worker request");
                continue;
            }

            match waiter.send(Ok(Reservation::new(worker.clone()))) {
                Ok(()) => {
                    tracing::debug!(
                        worker = %worker_id,
                        queued = state.waiters.len(),
                        "worker handed to queued caller"
                    );
                    self.emit(PoolEvent::Reserved(worker_id.to_string()));
                    return;
                }
                Err(returned) => {
                    // Caller went away between the check and the send
                    if let Ok(reservation) = returned {
                        reservation.disarm();
                    }
                }
            }
        }

        state.set_status(worker_id, WorkerStatus::Listening);
        tracing::debug!(worker = %worker_id, "worker listening");
    }
}

enum Acquire {
    Ready(Reservation),
    Queued(oneshot::Receiver<Result<Reservation>>),
}

/// A fixed set of workers handed out to callers on demand
///
/// Cloning a `WorkerPool` yields another handle to the same pool.
#[derive(Clone)]
pub struct WorkerPool {
    shared: Arc<PoolShared>,
}

impl WorkerPool {
    /// Creates `settings.concurrency` workers and starts the dispatcher
    ///
    /// Execution contexts are created concurrently. If any of them fails, the
    /// ones already created are stopped and the first error is returned.
    ///
    /// `Started` and `Listening` for each worker are published before this
    /// returns; only receivers of `settings.events` can observe them.
    ///
    /// # Arguments
    ///
    /// * `settings` - Pool size, cooldown, acquisition timeout and event channel
    /// * `factory` - Builds the execution context of each worker
    /// * `registry` - Identity registry owned by this pool
    pub async fn initialize(
        settings: PoolSettings,
        factory: Arc<dyn ContextFactory>,
        registry: Arc<IdentityRegistry>,
    ) -> Result<Self> {
        let concurrency = settings.concurrency.max(1);
        let (notifier, messages) = mpsc::unbounded_channel();

        let created = futures::future::join_all((0..concurrency).map(|_| {
            let factory = factory.clone();
            let registry = registry.clone();
            let notifier = notifier.clone();
            let cooldown = settings.cooldown;
            async move {
                let id = generate_worker_id();
                let identity = registry.create(&id);
                match factory.create(&id, &identity).await {
                    Ok(context) => Ok(Arc::new(Worker::new(
                        id, identity, context, cooldown, registry, notifier,
                    ))),
                    Err(e) => {
                        registry.clear(&id);
                        Err(e)
                    }
                }
            }
        }))
        .await;
        drop(notifier);

        let mut workers = Vec::with_capacity(concurrency);
        let mut first_error = None;
        for result in created {
            match result {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    tracing::error!(error = %e, "failed to create worker");
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(error) = first_error {
            for worker in &workers {
                worker.stop().await;
            }
            factory.shutdown().await;
            return Err(error);
        }

        let events = settings
            .events
            .clone()
            .unwrap_or_else(|| broadcast::channel(EVENT_CAPACITY).0);
        let mut state = PoolState {
            workers: HashMap::with_capacity(concurrency),
            order: Vec::with_capacity(concurrency),
            waiters: VecDeque::new(),
            closed: false,
        };

        for worker in &workers {
            state.order.push(worker.id().to_string());
            state.workers.insert(
                worker.id().to_string(),
                WorkerEntry {
                    worker: worker.clone(),
                    status: WorkerStatus::Listening,
                },
            );
        }

        let shared = Arc::new(PoolShared {
            state: Mutex::new(state),
            events,
            shutdown: CancellationToken::new(),
            factory,
            registry,
            acquire_timeout: settings.acquire_timeout,
            dispatcher: Mutex::new(None),
        });

        for worker in &workers {
            tracing::debug!(worker = %worker.id(), kind = %worker.kind(), "worker started");
            shared.emit(PoolEvent::Started(worker.id().to_string()));
            shared.emit(PoolEvent::Listening(worker.id().to_string()));
        }

        let handle = tokio::spawn(run_dispatcher(
            Arc::downgrade(&shared),
            messages,
            shared.shutdown.clone(),
        ));
        *shared
            .dispatcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);

        tracing::info!(
            workers = concurrency,
            cooldown_ms = settings.cooldown.as_millis() as u64,
            "worker pool initialized"
        );

        Ok(Self { shared })
    }

    /// Reserves a worker, waiting in the FIFO queue when none is free
    ///
    /// # Returns
    ///
    /// * `Ok(Reservation)` - Exclusive hold on a worker
    /// * `Err(HarvestError::PoolClosed)` - The pool was shut down
    /// * `Err(HarvestError::AcquireTimeout)` - The configured wait limit elapsed
    pub async fn request_worker(&self) -> Result<Reservation> {
        let receiver = match self.try_acquire()? {
            Acquire::Ready(reservation) => return Ok(reservation),
            Acquire::Queued(receiver) => receiver,
        };

        let started = Instant::now();
        let received = match self.shared.acquire_timeout {
            Some(limit) => tokio::time::timeout(limit, receiver).await.map_err(|_| {
                HarvestError::AcquireTimeout {
                    waited_ms: started.elapsed().as_millis() as u64,
                }
            })?,
            None => receiver.await,
        };

        received.unwrap_or(Err(HarvestError::PoolClosed))
    }

    /// Like `request_worker`, but gives up when `token` is cancelled
    pub async fn request_worker_with(&self, token: &CancellationToken) -> Result<Reservation> {
        if token.is_cancelled() {
            return Err(HarvestError::Cancelled);
        }

        tokio::select! {
            _ = token.cancelled() => Err(HarvestError::Cancelled),
            result = self.request_worker() => result,
        }
    }

    fn try_acquire(&self) -> Result<Acquire> {
        let mut state = self.shared.lock();
        if state.closed {
            return Err(HarvestError::PoolClosed);
        }

        if let Some(worker) = state.reserve_first_listening() {
            tracing::debug!(worker = %worker.id(), "worker reserved");
            self.shared.emit(PoolEvent::Reserved(worker.id().to_string()));
            return Ok(Acquire::Ready(Reservation::new(worker)));
        }

        // Drop callers that timed out or were cancelled while nothing was freed
        state.waiters.retain(|waiter| !waiter.is_closed());

        let (sender, receiver) = oneshot::channel();
        state.waiters.push_back(sender);
        tracing::debug!(queued = state.waiters.len(), "no free worker, request queued");
        Ok(Acquire::Queued(receiver))
    }

    /// Stops every worker and rejects all queued callers with `PoolClosed`
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) {
        let (workers, waiters) = {
            let mut state = self.shared.lock();
            if state.closed {
                return;
            }
            state.closed = true;

            let waiters: Vec<Waiter> = state.waiters.drain(..).collect();
            let PoolState { workers, order, .. } = &mut *state;
            let mut stopped = Vec::with_capacity(order.len());
            for id in order.iter() {
                if let Some(entry) = workers.get_mut(id) {
                    entry.status = WorkerStatus::Dead;
                    stopped.push(entry.worker.clone());
                }
            }
            (stopped, waiters)
        };

        if !waiters.is_empty() {
            tracing::info!(rejected = waiters.len(), "rejecting queued worker requests");
        }
        for waiter in waiters {
            let _ = waiter.send(Err(HarvestError::PoolClosed));
        }

        self.shared.shutdown.cancel();
        let dispatcher = self
            .shared
            .dispatcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = dispatcher {
            let _ = handle.await;
        }

        for worker in &workers {
            worker.stop().await;
            tracing::debug!(worker = %worker.id(), "worker died");
            self.shared.emit(PoolEvent::Died(worker.id().to_string()));
        }

        self.shared.factory.shutdown().await;
        tracing::info!(workers = workers.len(), "worker pool shut down");
    }

    /// Subscribes to worker lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.shared.events.subscribe()
    }

    /// Number of workers owned by the pool
    pub fn size(&self) -> usize {
        self.shared.lock().workers.len()
    }

    pub fn reserved_count(&self) -> usize {
        self.shared.lock().count(WorkerStatus::Reserved)
    }

    pub fn listening_count(&self) -> usize {
        self.shared.lock().count(WorkerStatus::Listening)
    }

    /// Callers currently waiting for a worker
    pub fn queued_len(&self) -> usize {
        self.shared
            .lock()
            .waiters
            .iter()
            .filter(|waiter| !waiter.is_closed())
            .count()
    }

    pub fn status_of(&self, worker_id: &str) -> Option<WorkerStatus> {
        self.shared
            .lock()
            .workers
            .get(worker_id)
            .map(|entry| entry.status)
    }

    /// Worker ids in creation order
    pub fn worker_ids(&self) -> Vec<String> {
        self.shared.lock().order.clone()
    }

    pub fn worker(&self, worker_id: &str) -> Option<Arc<Worker>> {
        self.shared
            .lock()
            .workers
            .get(worker_id)
            .map(|entry| entry.worker.clone())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    pub fn kind(&self) -> RuntimeKind {
        self.shared.factory.kind()
    }

    pub fn identities(&self) -> &Arc<IdentityRegistry> {
        &self.shared.registry
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("WorkerPool")
            .field("workers", &state.workers.len())
            .field("reserved", &state.count(WorkerStatus::Reserved))
            .field("queued", &state.waiters.len())
            .field("closed", &state.closed)
            .finish()
    }
}

async fn run_dispatcher(
    shared: Weak<PoolShared>,
    mut messages: mpsc::UnboundedReceiver<WorkerMessage>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            message = messages.recv() => {
                let Some(message) = message else { break };
                let Some(shared) = shared.upgrade() else { break };
                match message {
                    WorkerMessage::Listening { worker_id } => shared.handle_listening(&worker_id),
                }
            }
        }
    }
    tracing::trace!("pool dispatcher stopped");
}
