//! TaskHandle - caller side of a submitted task

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::domain::TaskId;

use super::error::TaskError;

/// Resolves once the task settles: with the operation's value on success, or
/// with a [`TaskError`] once retries are exhausted.
///
/// A handle whose task was removed by `clear()` never sees the operation's
/// outcome; it resolves to [`TaskError::Discarded`] instead.
pub struct TaskHandle<T, E> {
    id: TaskId,
    rx: oneshot::Receiver<Result<T, TaskError<E>>>,
}

impl<T, E> TaskHandle<T, E> {
    pub(crate) fn new(id: TaskId, rx: oneshot::Receiver<Result<T, TaskError<E>>>) -> Self {
        Self { id, rx }
    }

    /// Identity of the submitted task
    pub fn id(&self) -> &TaskId {
        &self.id
    }
}

impl<T, E> std::fmt::Debug for TaskHandle<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle").field("id", &self.id).finish()
    }
}

impl<T, E> Unpin for TaskHandle<T, E> {}

impl<T, E> Future for TaskHandle<T, E> {
    type Output = Result<T, TaskError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // Sender dropped without a reply: the descriptor never ran to settlement
            Poll::Ready(Err(_)) => Poll::Ready(Err(TaskError::Discarded { id: this.id.clone() })),
            Poll::Pending => Poll::Pending,
        }
    }
}
