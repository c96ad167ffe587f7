//! # Turbo Pool
//!
//! A bounded, dynamically sized worker pool: callers submit tasks, and a
//! single dispatcher thread spawns, feeds and retires worker threads under a
//! fixed ceiling.
//!
//! ## Features
//!
//! - **Bounded concurrency**: never more than `max_workers` active workers
//! - **On-demand workers**: threads are spawned as tasks arrive and retired
//!   again after a full idle-check interval without work
//! - **Backpressure**: `enqueue` blocks while every worker is busy
//! - **Priorities**: waiting tasks are served highest priority first, FIFO
//!   within a priority
//! - **Lifecycle control**: pause, resume, resize, flush and a graceful or
//!   forceful stop
//! - **Fault isolation**: a failing or panicking task never takes down its
//!   worker, and is reported through [`PoolHooks`]
//!
//! ## Quick Start
//!
//! ```rust
//! use turbo_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let pool = WorkerPool::new(4)?;
//!
//! for i in 0..10 {
//!     pool.enqueue(move || {
//!         println!("Task {} executing", i);
//!     })?;
//! }
//!
//! // Wait for everything queued so far, then shut down
//! pool.stop(true);
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use turbo_pool::prelude::*;
//! use std::time::Duration;
//!
//! # fn main() -> Result<()> {
//! let config = PoolConfig::new(8)
//!     .with_min_workers(2)
//!     .with_idle_check_interval(Duration::from_secs(30))
//!     .with_thread_name_prefix("ingest");
//!
//! let pool = WorkerPool::with_config(config)?;
//! # pool.stop(true);
//! # Ok(())
//! # }
//! ```
//!
//! ## Pausing and Flushing
//!
//! ```rust
//! use turbo_pool::prelude::*;
//! use std::time::Duration;
//!
//! # fn main() -> Result<()> {
//! let pool = WorkerPool::new(1)?;
//! pool.pause(&Context::with_timeout(Duration::from_secs(1)))?;
//!
//! // Accepted, but held until resume
//! pool.enqueue_with_priority(|| println!("second"), Priority::LOW)?;
//! pool.enqueue_with_priority(|| println!("first"), Priority::HIGH)?;
//!
//! pool.resume()?;
//! pool.flush(&Context::with_timeout(Duration::from_secs(5)))?;
//! println!("{:?}", pool.stats());
//! # pool.stop(true);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod pool;
pub mod prelude;
pub mod tracing;

pub use crate::core::{Context, ContextError, PoolError, PoolHooks, Priority, Result, Task, TaskId};
pub use crate::pool::{PoolConfig, PoolState, PoolStats, WorkerPool};
