//! Core types and traits for the worker pool

pub mod context;
pub mod error;
pub mod hooks;
pub mod priority;
pub mod task;

pub use context::{Context, ContextError};
pub use error::{PoolError, Result};
pub use hooks::PoolHooks;
pub use priority::Priority;
pub use task::{Task, TaskError, TaskFn, TaskId, TaskOutcome};
