//! Convenient re-exports for common types and traits

pub use crate::core::{Context, PoolError, PoolHooks, Priority, Result, Task, TaskId};
pub use crate::pool::{PoolConfig, PoolState, PoolStats, WorkerPool};
