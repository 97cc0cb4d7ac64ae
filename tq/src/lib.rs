//! TaskQueue - in-process task scheduler
//!
//! TaskQueue runs a dynamic stream of asynchronous operations under a
//! bounded concurrency limit. Pending work is admitted highest priority
//! first, failed operations are requeued while their retry budget lasts,
//! and live progress is reported as tasks settle.
//!
//! # Core Concepts
//!
//! - **Admission**: a queued task starts as soon as a concurrency slot frees up
//! - **Settlement**: a task settles once, on success or when retries run out
//! - **Isolation**: a failing task never fails its batch or the scheduler
//!
//! # Modules
//!
//! - [`scheduler`] - TaskScheduler, handles, and batch execution
//! - [`retry`] - Standalone bounded retry with a flat delay
//! - [`worklist`] - Line-oriented work list reader
//! - [`shell`] - Shell command operations
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod retry;
pub mod scheduler;
pub mod shell;
pub mod worklist;

// Re-export commonly used types
pub use config::Config;
pub use domain::{Priority, TaskId};
pub use retry::{RetryConfig, bounded_retry};
pub use scheduler::{
    BatchJob, SchedulerConfig, SchedulerError, SchedulerStats, SchedulerStatus, Settlement, SettlementOutcome,
    TaskError, TaskHandle, TaskOptions, TaskScheduler, percent_complete, run_batch,
};
pub use shell::{ShellError, run_shell};
pub use worklist::{WorkItem, parse_work_items, read_work_items};
