//! Queue types for the scheduler

use std::cmp::{Ordering, Reverse};
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::domain::{Priority, TaskId};

use super::error::TaskError;

/// A re-invocable unit of asynchronous work. Called once per attempt.
pub type Operation<T, E> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

/// Box a closure into an [`Operation`]
pub fn operation<T, E, F, Fut>(f: F) -> Operation<T, E>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Per-submission options. Unset fields fall back to the scheduler config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOptions {
    pub priority: Option<Priority>,
    pub retries: Option<u32>,
    pub id: Option<TaskId>,
}

impl TaskOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// An operation paired with its submission options
pub struct BatchJob<T, E> {
    pub operation: Operation<T, E>,
    pub options: TaskOptions,
}

impl<T, E> BatchJob<T, E> {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            operation: operation(f),
            options: TaskOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TaskOptions) -> Self {
        self.options = options;
        self
    }
}

/// A task owned by the scheduler from submission until it settles
pub(crate) struct TaskDescriptor<T, E> {
    pub id: TaskId,
    pub priority: Priority,
    pub remaining_retries: u32,
    pub attempts: u32,
    pub operation: Operation<T, E>,
    pub reply: oneshot::Sender<Result<T, TaskError<E>>>,
}

/// Queue entry. `seq` is assigned on every (re)insertion, so a retried task
/// ranks behind equal-priority tasks that were queued before it failed.
pub(crate) struct Pending<T, E> {
    pub seq: u64,
    pub descriptor: TaskDescriptor<T, E>,
}

impl<T, E> Pending<T, E> {
    fn key(&self) -> (Priority, Reverse<u64>) {
        (self.descriptor.priority, Reverse(self.seq))
    }
}

impl<T, E> Eq for Pending<T, E> {}

impl<T, E> PartialEq for Pending<T, E> {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl<T, E> Ord for Pending<T, E> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority first, then earlier insertion
        self.key().cmp(&other.key())
    }
}

impl<T, E> PartialOrd for Pending<T, E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Point-in-time view of the scheduler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub queue_length: usize,
    pub running_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub total_tasks: usize,
}

/// Cumulative statistics for the scheduler
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub total_submitted: u64,
    pub total_attempts: u64,
    pub total_retries: u64,
    pub total_discarded: u64,
    pub peak_concurrent: usize,
    pub peak_queue_depth: usize,
}

/// How a task left the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum SettlementOutcome {
    Completed,
    Failed { error: String },
    Panicked,
    /// Removed by `clear()`; not a settlement of the operation itself
    Discarded,
}

/// Event published whenever a task leaves the scheduler. `status` is captured
/// under the same lock as the counter update that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: TaskId,
    pub attempts: u32,
    #[serde(flatten)]
    pub outcome: SettlementOutcome,
    pub status: SchedulerStatus,
}

impl Settlement {
    /// True for completion and permanent failure, false for discards
    pub fn is_settled(&self) -> bool {
        !matches!(self.outcome, SettlementOutcome::Discarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    fn pending(id: &str, priority: i64, seq: u64) -> Pending<(), String> {
        let (reply, _rx) = oneshot::channel();
        Pending {
            seq,
            descriptor: TaskDescriptor {
                id: TaskId::from(id),
                priority: Priority::new(priority),
                remaining_retries: 0,
                attempts: 0,
                operation: operation(|| async { Ok::<(), String>(()) }),
                reply,
            },
        }
    }

    #[test]
    fn test_pending_priority_ordering() {
        let high = pending("high", 5, 1);
        let low = pending("low", 1, 0);

        // Higher priority wins regardless of insertion order
        assert!(high > low);
    }

    #[test]
    fn test_pending_same_priority_fifo() {
        let first = pending("first", 1, 0);
        let second = pending("second", 1, 1);

        // Earlier insertion should come first (so it's "greater" in the heap)
        assert!(first > second);
    }

    #[test]
    fn test_heap_pops_in_admission_order() {
        let mut heap = BinaryHeap::new();
        heap.push(pending("a", 1, 0));
        heap.push(pending("b", 5, 1));
        heap.push(pending("c", 1, 2));

        let order: Vec<_> = std::iter::from_fn(|| heap.pop())
            .map(|p| p.descriptor.id.to_string())
            .collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_task_options_builder() {
        let options = TaskOptions::new().priority(3).retries(0).id("apple");
        assert_eq!(options.priority, Some(Priority::new(3)));
        assert_eq!(options.retries, Some(0));
        assert_eq!(options.id, Some(TaskId::from("apple")));
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = SchedulerStatus {
            queue_length: 1,
            running_tasks: 2,
            completed_tasks: 3,
            failed_tasks: 0,
            total_tasks: 6,
        };
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["queueLength"], 1);
        assert_eq!(json["runningTasks"], 2);
        assert_eq!(json["completedTasks"], 3);
        assert_eq!(json["totalTasks"], 6);
    }

    #[test]
    fn test_settlement_is_settled() {
        let mut settlement = Settlement {
            id: TaskId::from("task-1"),
            attempts: 1,
            outcome: SettlementOutcome::Completed,
            status: SchedulerStatus::default(),
        };
        assert!(settlement.is_settled());

        settlement.outcome = SettlementOutcome::Discarded;
        assert!(!settlement.is_settled());
    }
}
