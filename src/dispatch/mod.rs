//! Task snapshots, the bounded work queue, and the worker pool that drains it.

pub mod dispatcher;
pub mod pool;
pub(crate) mod queue;
pub mod task;

pub use dispatcher::Dispatcher;
pub use pool::{CompletedTask, PoolReport, TaskFailure, WorkerPool, WorkerState};
pub use task::{RenderTask, TaskId};
