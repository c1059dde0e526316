use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError, PermitIterator};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::line::Event;

// ─── Envelope ────────────────────────────────────────────────────────────────

/// Serialized form of one webhook event: base64 of the event JSON.
/// The `/task` endpoint accepts the same shape as a form body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TaskEnvelope {
    #[serde(default)]
    pub data: String,
}

impl TaskEnvelope {
    pub fn encode(event: &Event) -> Result<Self, AppError> {
        let json = serde_json::to_vec(event)?;
        Ok(Self { data: STANDARD.encode(json) })
    }

    pub fn decode(&self) -> Result<Event, AppError> {
        if self.data.is_empty() {
            return Err(AppError::MissingTaskData);
        }
        let json = STANDARD.decode(self.data.as_bytes())?;
        Ok(serde_json::from_slice(&json)?)
    }
}

// ─── Queue ───────────────────────────────────────────────────────────────────

const OVERSIZED_BATCH_WAIT_SECS: u64 = 5;

/// Consumer side of the queue.
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    async fn handle(&self, task: TaskEnvelope) -> Result<(), AppError>;
}

struct QueuedTask {
    id: Uuid,
    envelope: TaskEnvelope,
}

/// Bounded in-process task queue drained by a background worker.
#[derive(Clone)]
pub struct TaskQueue {
    sender: mpsc::Sender<QueuedTask>,
    pending: Arc<AtomicUsize>,
}

/// Handle on the worker behind a `TaskQueue`.
pub struct TaskWorker {
    handle: JoinHandle<()>,
    pending: Arc<AtomicUsize>,
}

impl TaskQueue {
    pub fn spawn(capacity: usize, handler: Arc<dyn TaskHandler>) -> (Self, TaskWorker) {
        let (tx, rx) = mpsc::channel::<QueuedTask>(capacity.max(1));
        let pending = Arc::new(AtomicUsize::new(0));
        let handle = tokio::spawn(worker_loop(rx, handler, pending.clone()));
        (
            Self { sender: tx, pending: pending.clone() },
            TaskWorker { handle, pending },
        )
    }

    /// Enqueue a single envelope without waiting for capacity.
    #[cfg(test)]
    fn enqueue(&self, envelope: TaskEnvelope) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        let permit = self.sender.try_reserve().map_err(queue_error)?;
        self.pending.fetch_add(1, Ordering::Relaxed);
        permit.send(QueuedTask { id, envelope });
        Ok(id)
    }

    /// Encode and enqueue every event.
    ///
    /// A batch that fits in the channel is all-or-nothing and never waits.
    /// A batch larger than the channel is handed over in capacity-sized
    /// chunks while the worker drains, bounded by a fixed wait per chunk.
    #[instrument(skip_all, fields(events = events.len()))]
    pub async fn enqueue_all(&self, events: &[Event]) -> Result<usize, AppError> {
        if events.is_empty() {
            return Ok(0);
        }

        let tasks = events
            .iter()
            .map(|e| TaskEnvelope::encode(e).map(|envelope| QueuedTask { id: Uuid::new_v4(), envelope }))
            .collect::<Result<Vec<_>, _>>()?;

        let count = tasks.len();
        let capacity = self.sender.max_capacity();

        if count <= capacity {
            let permits = self
                .sender
                .try_reserve_many(count)
                .map_err(queue_error)?;
            self.send_all(count, permits, tasks.into_iter());
            return Ok(count);
        }

        warn!(capacity, "Batch exceeds queue capacity, enqueueing in chunks");
        let wait = Duration::from_secs(OVERSIZED_BATCH_WAIT_SECS);
        let mut tasks = tasks.into_iter();
        let mut queued = 0;

        while queued < count {
            let n = capacity.min(count - queued);
            let permits = match timeout(wait, self.sender.reserve_many(n)).await {
                Ok(Ok(permits)) => permits,
                Ok(Err(_)) => {
                    error!(queued, dropped = count - queued, "Queue closed mid-batch");
                    return Err(AppError::QueueClosed);
                }
                Err(_) => {
                    error!(queued, dropped = count - queued, "Timed out enqueueing oversized batch");
                    return Err(AppError::QueueFull);
                }
            };
            self.send_all(n, permits, tasks.by_ref());
            queued += n;
        }

        Ok(count)
    }

    fn send_all(
        &self,
        n: usize,
        permits: PermitIterator<'_, QueuedTask>,
        tasks: impl Iterator<Item = QueuedTask>,
    ) {
        self.pending.fetch_add(n, Ordering::Relaxed);
        for (permit, task) in permits.zip(tasks) {
            debug!(task_id = %task.id, "Task enqueued");
            permit.send(task);
        }
    }

    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Tasks queued or still running.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    fn detached(capacity: usize) -> (Self, mpsc::Receiver<QueuedTask>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { sender: tx, pending: Arc::default() }, rx)
    }
}

impl TaskWorker {
    /// Wait for the worker to finish every queued and running task. The
    /// worker only stops once all `TaskQueue` handles are dropped.
    ///
    /// Returns `false` if the deadline passed; remaining tasks are aborted.
    pub async fn shutdown(mut self, deadline: Duration) -> bool {
        match timeout(deadline, &mut self.handle).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(error = %e, "Task worker failed");
                false
            }
            Err(_) => {
                warn!(
                    abandoned = self.pending.load(Ordering::Relaxed),
                    "Drain deadline reached, abandoning tasks"
                );
                self.handle.abort();
                false
            }
        }
    }
}

fn queue_error<T>(e: TrySendError<T>) -> AppError {
    match e {
        TrySendError::Full(_) => AppError::QueueFull,
        TrySendError::Closed(_) => AppError::QueueClosed,
    }
}

async fn worker_loop(
    mut rx: mpsc::Receiver<QueuedTask>,
    handler: Arc<dyn TaskHandler>,
    pending: Arc<AtomicUsize>,
) {
    info!("Task worker started");
    let mut running = JoinSet::new();

    loop {
        tokio::select! {
            task = rx.recv() => match task {
                Some(task) => {
                    running.spawn(run_task(handler.clone(), task, pending.clone()));
                }
                None => break,
            },
            Some(joined) = running.join_next(), if !running.is_empty() => {
                reap(joined, &pending);
            }
        }
    }

    info!(running = running.len(), "Task queue closed, draining");
    while let Some(joined) = running.join_next().await {
        reap(joined, &pending);
    }

    info!("Task worker shutting down");
}

async fn run_task(handler: Arc<dyn TaskHandler>, task: QueuedTask, pending: Arc<AtomicUsize>) {
    match handler.handle(task.envelope).await {
        Ok(()) => debug!(task_id = %task.id, "Task completed"),
        Err(e) => error!(task_id = %task.id, error = %e, "Task failed"),
    }
    pending.fetch_sub(1, Ordering::Relaxed);
}

fn reap(joined: Result<(), JoinError>, pending: &AtomicUsize) {
    if let Err(e) = joined {
        pending.fetch_sub(1, Ordering::Relaxed);
        error!(error = %e, "Task panicked");
    }
}
