//! Scheduler implementation

use std::collections::{BinaryHeap, HashSet};
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{Mutex, Notify, mpsc, oneshot};
use tracing::{debug, warn};

use crate::domain::{IdGenerator, TaskId};

use super::config::SchedulerConfig;
use super::error::{SchedulerError, TaskError};
use super::handle::TaskHandle;
use super::queue::{
    BatchJob, Operation, Pending, SchedulerStats, SchedulerStatus, Settlement, SettlementOutcome, TaskDescriptor,
    TaskOptions, operation,
};

/// Internal state protected by mutex
struct SchedulerInner<T, E> {
    /// Priority queue of waiting tasks
    queue: BinaryHeap<Pending<T, E>>,

    /// Identities that are queued or running
    live: HashSet<TaskId>,

    /// Number of operations currently executing
    running: usize,

    completed: usize,
    failed: usize,

    /// Insertion counter for FIFO tie-breaking
    next_seq: u64,

    stats: SchedulerStats,

    /// Settlement listeners
    subscribers: Vec<mpsc::UnboundedSender<Settlement>>,
}

impl<T, E> SchedulerInner<T, E> {
    fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            live: HashSet::new(),
            running: 0,
            completed: 0,
            failed: 0,
            next_seq: 0,
            stats: SchedulerStats::default(),
            subscribers: Vec::new(),
        }
    }

    fn enqueue(&mut self, descriptor: TaskDescriptor<T, E>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Pending { seq, descriptor });
        self.stats.peak_queue_depth = self.stats.peak_queue_depth.max(self.queue.len());
    }

    fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            queue_length: self.queue.len(),
            running_tasks: self.running,
            completed_tasks: self.completed,
            failed_tasks: self.failed,
            total_tasks: self.queue.len() + self.running + self.completed + self.failed,
        }
    }

    fn is_idle(&self) -> bool {
        self.running == 0 && self.queue.is_empty()
    }

    fn publish(&mut self, id: TaskId, attempts: u32, outcome: SettlementOutcome) {
        if self.subscribers.is_empty() {
            return;
        }
        let settlement = Settlement {
            id,
            attempts,
            outcome,
            status: self.status(),
        };
        self.subscribers.retain(|tx| tx.send(settlement.clone()).is_ok());
    }
}

struct Shared<T, E> {
    config: SchedulerConfig,
    ids: IdGenerator,
    inner: Mutex<SchedulerInner<T, E>>,
    idle: Notify,
}

/// The TaskScheduler runs submitted operations under a concurrency limit,
/// admitting them in priority order and requeueing failures while their
/// retry budget lasts.
///
/// All state transitions happen under one mutex. A settling task frees its
/// slot and runs admission in the same critical section, so the running count
/// never exceeds the limit and no polling is involved. Operations are spawned
/// onto the current tokio runtime.
pub struct TaskScheduler<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Clone for TaskScheduler<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> TaskScheduler<T, E>
where
    T: Send + 'static,
    E: Display + Send + 'static,
{
    /// Create a new scheduler with the given configuration
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        debug!(?config, "TaskScheduler::new: called");
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                ids: IdGenerator::new(),
                inner: Mutex::new(SchedulerInner::new()),
                idle: Notify::new(),
            }),
        })
    }

    /// Create a scheduler with the given concurrency limit and default options
    pub fn with_limit(max_concurrent: usize) -> Result<Self, SchedulerError> {
        Self::new(SchedulerConfig::with_limit(max_concurrent))
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Submit one operation. Admission is attempted immediately.
    pub async fn submit<F, Fut>(&self, f: F, options: TaskOptions) -> Result<TaskHandle<T, E>, SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.submit_operation(operation(f), options).await
    }

    /// Submit an already boxed operation
    pub async fn submit_operation(
        &self,
        operation: Operation<T, E>,
        options: TaskOptions,
    ) -> Result<TaskHandle<T, E>, SchedulerError> {
        debug!(?options, "TaskScheduler::submit: called");
        let mut inner = self.shared.inner.lock().await;

        let (descriptor, handle) = self.prepare(&inner, &HashSet::new(), operation, options)?;
        debug!(id = %descriptor.id, priority = %descriptor.priority, "TaskScheduler::submit: queued");
        inner.live.insert(descriptor.id.clone());
        inner.stats.total_submitted += 1;
        inner.enqueue(descriptor);

        self.admit(&mut inner);
        Ok(handle)
    }

    /// Submit a batch atomically: every job is validated first, then all are
    /// queued before admission runs, so priority ordering applies across the
    /// whole batch. On error nothing is queued.
    pub async fn submit_many(&self, jobs: Vec<BatchJob<T, E>>) -> Result<Vec<TaskHandle<T, E>>, SchedulerError> {
        debug!(count = jobs.len(), "TaskScheduler::submit_many: called");
        let mut inner = self.shared.inner.lock().await;

        let mut batch_ids = HashSet::new();
        let mut prepared = Vec::with_capacity(jobs.len());
        for job in jobs {
            let (descriptor, handle) = self.prepare(&inner, &batch_ids, job.operation, job.options)?;
            batch_ids.insert(descriptor.id.clone());
            prepared.push((descriptor, handle));
        }

        let mut handles = Vec::with_capacity(prepared.len());
        for (descriptor, handle) in prepared {
            inner.live.insert(descriptor.id.clone());
            inner.stats.total_submitted += 1;
            inner.enqueue(descriptor);
            handles.push(handle);
        }

        self.admit(&mut inner);
        Ok(handles)
    }

    /// Validate options and build the descriptor/handle pair
    fn prepare(
        &self,
        inner: &SchedulerInner<T, E>,
        batch_ids: &HashSet<TaskId>,
        operation: Operation<T, E>,
        options: TaskOptions,
    ) -> Result<(TaskDescriptor<T, E>, TaskHandle<T, E>), SchedulerError> {
        let config = &self.shared.config;
        let priority = options.priority.unwrap_or(config.default_priority);
        if priority.is_negative() {
            debug!(%priority, "TaskScheduler::prepare: negative priority, rejecting");
            return Err(SchedulerError::InvalidPriority(priority));
        }

        let taken = |id: &TaskId| inner.live.contains(id) || batch_ids.contains(id);
        let id = match options.id {
            Some(id) if id.is_empty() => return Err(SchedulerError::EmptyIdentity),
            Some(id) if taken(&id) => {
                debug!(%id, "TaskScheduler::prepare: identity in use, rejecting");
                return Err(SchedulerError::DuplicateIdentity(id));
            }
            Some(id) => id,
            None => loop {
                let id = self.shared.ids.next_id();
                if !taken(&id) {
                    break id;
                }
            },
        };

        let (reply, rx) = oneshot::channel();
        let descriptor = TaskDescriptor {
            id: id.clone(),
            priority,
            remaining_retries: options.retries.unwrap_or(config.default_retries),
            attempts: 0,
            operation,
            reply,
        };
        Ok((descriptor, TaskHandle::new(id, rx)))
    }

    /// Launch queued tasks while slots are free. Caller holds the lock.
    fn admit(&self, inner: &mut SchedulerInner<T, E>) {
        while inner.running < self.shared.config.max_concurrent {
            let Some(pending) = inner.queue.pop() else {
                break;
            };
            let mut descriptor = pending.descriptor;
            descriptor.attempts += 1;
            inner.running += 1;
            inner.stats.total_attempts += 1;
            inner.stats.peak_concurrent = inner.stats.peak_concurrent.max(inner.running);

            debug!(
                id = %descriptor.id,
                priority = %descriptor.priority,
                attempt = descriptor.attempts,
                running = inner.running,
                "TaskScheduler::admit: launching"
            );
            self.launch(descriptor);
        }

        if inner.is_idle() {
            self.shared.idle.notify_waiters();
        }
    }

    fn launch(&self, descriptor: TaskDescriptor<T, E>) {
        let scheduler = self.clone();
        let operation = Arc::clone(&descriptor.operation);
        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(async move { operation().await }).catch_unwind().await;
            scheduler.settle(descriptor, outcome).await;
        });
    }

    /// Record the outcome of one attempt, then refill free slots
    async fn settle(&self, descriptor: TaskDescriptor<T, E>, outcome: std::thread::Result<Result<T, E>>) {
        let mut inner = self.shared.inner.lock().await;
        inner.running -= 1;

        let TaskDescriptor {
            id,
            priority,
            remaining_retries,
            attempts,
            operation,
            reply,
        } = descriptor;

        match outcome {
            Ok(Ok(value)) => {
                debug!(%id, attempts, "TaskScheduler::settle: completed");
                inner.completed += 1;
                inner.live.remove(&id);
                inner.publish(id, attempts, SettlementOutcome::Completed);
                let _ = reply.send(Ok(value));
            }
            Ok(Err(error)) if remaining_retries > 0 => {
                debug!(%id, attempts, remaining_retries, %error, "TaskScheduler::settle: failed, requeueing");
                inner.stats.total_retries += 1;
                inner.enqueue(TaskDescriptor {
                    id,
                    priority,
                    remaining_retries: remaining_retries - 1,
                    attempts,
                    operation,
                    reply,
                });
            }
            Ok(Err(error)) => {
                warn!(%id, attempts, %error, "Task failed permanently");
                inner.failed += 1;
                inner.live.remove(&id);
                inner.publish(
                    id.clone(),
                    attempts,
                    SettlementOutcome::Failed {
                        error: error.to_string(),
                    },
                );
                let _ = reply.send(Err(TaskError::Failed { id, attempts, error }));
            }
            Err(_) => {
                warn!(%id, attempts, "Task panicked");
                inner.failed += 1;
                inner.live.remove(&id);
                inner.publish(id.clone(), attempts, SettlementOutcome::Panicked);
                let _ = reply.send(Err(TaskError::Panicked { id }));
            }
        }

        self.admit(&mut inner);
    }

    /// Get current queue state
    pub async fn status(&self) -> SchedulerStatus {
        debug!("TaskScheduler::status: called");
        self.shared.inner.lock().await.status()
    }

    /// Get the scheduler statistics
    pub async fn stats(&self) -> SchedulerStats {
        debug!("TaskScheduler::stats: called");
        self.shared.inner.lock().await.stats.clone()
    }

    /// Drop every task that has not started yet. Running tasks are untouched
    /// and settle normally. Returns the number of tasks discarded.
    pub async fn clear(&self) -> usize {
        debug!("TaskScheduler::clear: called");
        let mut inner = self.shared.inner.lock().await;

        let drained: Vec<_> = inner.queue.drain().collect();
        let count = drained.len();
        for pending in drained {
            let TaskDescriptor {
                id, attempts, reply, ..
            } = pending.descriptor;
            inner.live.remove(&id);
            inner.stats.total_discarded += 1;
            inner.publish(id.clone(), attempts, SettlementOutcome::Discarded);
            let _ = reply.send(Err(TaskError::Discarded { id }));
        }

        debug!(count, "TaskScheduler::clear: discarded pending tasks");
        if inner.is_idle() {
            self.shared.idle.notify_waiters();
        }
        count
    }

    /// Receive a [`Settlement`] for every task that leaves the scheduler from
    /// now on
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<Settlement> {
        debug!("TaskScheduler::subscribe: called");
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.inner.lock().await.subscribers.push(tx);
        rx
    }

    /// Wait until nothing is queued or running
    pub async fn wait_idle(&self) {
        debug!("TaskScheduler::wait_idle: called");
        loop {
            let notified = self.shared.idle.notified();
            if self.shared.inner.lock().await.is_idle() {
                return;
            }
            notified.await;
        }
    }
}
