//! Domain types for TaskQueue
//!
//! Task identity and priority, shared by the scheduler and its callers.

mod id;
mod priority;

pub use id::{IdGenerator, TaskId};
pub use priority::Priority;
