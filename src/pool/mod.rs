//! Worker pool implementation

mod config;
mod dispatcher;
mod pending;
mod shared;
mod stats;
mod worker;
mod worker_pool;

pub use config::{PoolConfig, DEFAULT_IDLE_CHECK_INTERVAL};
pub use stats::{PoolState, PoolStats};
pub use worker_pool::WorkerPool;
