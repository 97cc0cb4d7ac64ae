//! Scheduler for asynchronous tasks
//!
//! Runs submitted operations with priority queuing, a concurrency limit,
//! and per-task retry budgets in a single component.

mod batch;
mod config;
mod core;
mod error;
mod handle;
mod queue;

pub use batch::{percent_complete, run_batch};
pub use config::SchedulerConfig;
pub use self::core::TaskScheduler;
pub use error::{SchedulerError, TaskError};
pub use handle::TaskHandle;
pub use queue::{
    BatchJob, Operation, SchedulerStats, SchedulerStatus, Settlement, SettlementOutcome, TaskOptions, operation,
};
