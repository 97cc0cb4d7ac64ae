//! Scheduler error types

use thiserror::Error;

use crate::domain::{Priority, TaskId};

/// Contract errors raised synchronously at construction or submission time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("Concurrency limit must be at least 1")]
    InvalidConcurrency,

    #[error("Invalid priority {0}: must be non-negative")]
    InvalidPriority(Priority),

    #[error("Task identity must not be empty")]
    EmptyIdentity,

    #[error("Duplicate task identity: {0}")]
    DuplicateIdentity(TaskId),
}

/// Terminal error delivered through a task handle
#[derive(Debug, Error)]
pub enum TaskError<E> {
    /// Retries exhausted; carries the error from the last attempt
    #[error("Task {id} failed after {attempts} attempt(s): {error}")]
    Failed { id: TaskId, attempts: u32, error: E },

    /// The operation panicked; panics are never retried
    #[error("Task {id} panicked")]
    Panicked { id: TaskId },

    /// Removed by `clear()` before it was ever started
    #[error("Task {id} was discarded before it started")]
    Discarded { id: TaskId },
}

impl<E> TaskError<E> {
    /// Identity of the task this error belongs to
    pub fn id(&self) -> &TaskId {
        match self {
            TaskError::Failed { id, .. } | TaskError::Panicked { id } | TaskError::Discarded { id } => id,
        }
    }

    /// Whether the operation itself ran and failed permanently
    pub fn is_failed(&self) -> bool {
        matches!(self, TaskError::Failed { .. } | TaskError::Panicked { .. })
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, TaskError::Discarded { .. })
    }

    /// Get the underlying operation error, if there is one
    pub fn into_error(self) -> Option<E> {
        match self {
            TaskError::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}
