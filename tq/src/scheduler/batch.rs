//! Batch execution with progress reporting

use std::collections::HashSet;
use std::fmt::Display;

use tracing::{debug, info};

use super::config::SchedulerConfig;
use super::core::TaskScheduler;
use super::error::SchedulerError;
use super::queue::{BatchJob, SchedulerStatus, SettlementOutcome};

/// Percentage of `total` that completed successfully, rounded to one decimal.
///
/// Failed tasks are not counted, so a batch with permanent failures finishes
/// below 100.
pub fn percent_complete(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (completed as f64 / total as f64 * 1000.0).round() / 10.0
}

/// Run every job on a fresh scheduler limited to `limit` concurrent tasks.
///
/// `on_progress(percent, status)` is called once per settled task. The result
/// vector is index-aligned with `jobs`; permanently failed tasks yield `None`.
/// Individual failures never fail the batch. Only contract errors (invalid
/// limit, bad options) do, before anything runs.
pub async fn run_batch<T, E, F>(
    jobs: Vec<BatchJob<T, E>>,
    limit: usize,
    on_progress: F,
) -> Result<Vec<Option<T>>, SchedulerError>
where
    T: Send + 'static,
    E: Display + Send + 'static,
    F: FnMut(f64, SchedulerStatus),
{
    let scheduler = TaskScheduler::new(SchedulerConfig::with_limit(limit))?;
    scheduler.run_batch(jobs, on_progress).await
}

impl<T, E> TaskScheduler<T, E>
where
    T: Send + 'static,
    E: Display + Send + 'static,
{
    /// Run a batch on this scheduler. See [`run_batch`].
    ///
    /// The percentage counts only this batch's tasks; the status snapshot is
    /// scheduler-wide.
    pub async fn run_batch<F>(
        &self,
        jobs: Vec<BatchJob<T, E>>,
        mut on_progress: F,
    ) -> Result<Vec<Option<T>>, SchedulerError>
    where
        F: FnMut(f64, SchedulerStatus),
    {
        let total = jobs.len();
        debug!(total, "TaskScheduler::run_batch: called");
        if total == 0 {
            return Ok(Vec::new());
        }

        let mut events = self.subscribe().await;
        let handles = self.submit_many(jobs).await?;
        let mut remaining: HashSet<_> = handles.iter().map(|h| h.id().clone()).collect();
        info!(total, limit = self.config().max_concurrent, "Batch started");

        let mut completed = 0;
        while !remaining.is_empty() {
            let Some(event) = events.recv().await else {
                break;
            };
            if !remaining.remove(&event.id) {
                continue;
            }
            match event.outcome {
                SettlementOutcome::Completed => completed += 1,
                SettlementOutcome::Discarded => continue,
                SettlementOutcome::Failed { .. } | SettlementOutcome::Panicked => {}
            }
            on_progress(percent_complete(completed, total), event.status);
        }

        let mut results = Vec::with_capacity(total);
        for handle in handles {
            results.push(handle.await.ok());
        }

        let failed = results.iter().filter(|r| r.is_none()).count();
        info!(total, completed, failed, "Batch finished");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::scheduler::TaskOptions;

    #[test]
    fn test_percent_complete_rounding() {
        assert_eq!(percent_complete(0, 10), 0.0);
        assert_eq!(percent_complete(1, 3), 33.3);
        assert_eq!(percent_complete(2, 3), 66.7);
        assert_eq!(percent_complete(10, 10), 100.0);
        assert_eq!(percent_complete(3, 5), 60.0);
        assert_eq!(percent_complete(0, 0), 100.0);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let results = run_batch(Vec::<BatchJob<u32, String>>::new(), 3, |_, _| {
            panic!("no progress expected for an empty batch")
        })
        .await
        .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_zero_limit_is_contract_error() {
        let jobs = vec![BatchJob::new(|| async { Ok::<u32, String>(1) })];
        let err = run_batch(jobs, 0, |_, _| {}).await.unwrap_err();
        assert_eq!(err, SchedulerError::InvalidConcurrency);
    }

    #[tokio::test]
    async fn test_all_succeed() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let jobs: Vec<BatchJob<usize, String>> = (0..10)
            .map(|i| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                BatchJob::new(move || {
                    let active = Arc::clone(&active);
                    let peak = Arc::clone(&peak);
                    async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5 + (i as u64 % 3) * 5)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                        Ok(i * 2)
                    }
                })
            })
            .collect();

        let mut calls = Vec::new();
        let results = run_batch(jobs, 3, |percent, status| calls.push((percent, status)))
            .await
            .unwrap();

        assert_eq!(results, (0..10).map(|i| Some(i * 2)).collect::<Vec<_>>());
        assert!(peak.load(Ordering::SeqCst) <= 3);

        assert_eq!(calls.len(), 10);
        for pair in calls.windows(2) {
            assert!(pair[1].1.completed_tasks > pair[0].1.completed_tasks);
        }
        let hundreds = calls.iter().filter(|(percent, _)| *percent == 100.0).count();
        assert_eq!(hundreds, 1);
        assert_eq!(calls[9].0, 100.0);
    }

    #[tokio::test]
    async fn test_failures_leave_gaps() {
        let jobs: Vec<BatchJob<u32, String>> = (0..5u32)
            .map(|i| {
                BatchJob::new(move || async move {
                    if i == 1 || i == 3 { Err(format!("item {} broke", i)) } else { Ok(i) }
                })
                .with_options(TaskOptions::new().retries(0))
            })
            .collect();

        let mut last = None;
        let mut calls = 0;
        let results = run_batch(jobs, 2, |percent, status| {
            calls += 1;
            last = Some((percent, status));
        })
        .await
        .unwrap();

        assert_eq!(results, vec![Some(0), None, Some(2), None, Some(4)]);
        assert_eq!(calls, 5);

        // Failures are excluded from the percentage, so the batch ends at 60%
        let (percent, status) = last.unwrap();
        assert_eq!(percent, 60.0);
        assert_eq!(status.completed_tasks, 3);
        assert_eq!(status.failed_tasks, 2);
        assert_eq!(status.queue_length, 0);
        assert_eq!(status.running_tasks, 0);
    }

    #[tokio::test]
    async fn test_batch_on_shared_scheduler_counts_only_its_tasks() {
        let scheduler = TaskScheduler::<u32, String>::with_limit(2).unwrap();
        let outside = scheduler
            .submit(|| async { Ok(100) }, TaskOptions::new().id("outside"))
            .await
            .unwrap();

        let jobs = vec![
            BatchJob::new(|| async { Ok(1) }),
            BatchJob::new(|| async { Ok(2) }),
        ];
        let mut percents = Vec::new();
        let results = scheduler.run_batch(jobs, |percent, _| percents.push(percent)).await.unwrap();

        assert_eq!(results, vec![Some(1), Some(2)]);
        assert_eq!(percents, vec![50.0, 100.0]);
        assert_eq!(outside.await.unwrap(), 100);
    }
}
