//! Lifecycle callbacks

use crate::core::error::PoolError;
use crate::core::task::TaskId;

/// Callbacks fired at various stages of the pool lifecycle.
///
/// Every method has a no-op default, so implementors only override what they
/// observe. Hooks run on pool threads and must not call [`WorkerPool::stop`]
/// (the stop would wait on the very thread running the hook).
///
/// [`WorkerPool::stop`]: crate::WorkerPool::stop
///
/// # Example
///
/// ```rust
/// use turbo_pool::prelude::*;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct CountStarts(AtomicUsize);
///
/// impl PoolHooks for CountStarts {
///     fn on_worker_start(&self, _id: usize) {
///         self.0.fetch_add(1, Ordering::SeqCst);
///     }
/// }
///
/// # fn main() -> Result<()> {
/// let hooks = Arc::new(CountStarts::default());
/// let pool = WorkerPool::with_config(PoolConfig::new(2).with_hooks(hooks.clone()))?;
/// pool.enqueue(|| {})?;
/// pool.stop(true);
/// assert_eq!(hooks.0.load(Ordering::SeqCst), 1);
/// # Ok(())
/// # }
/// ```
pub trait PoolHooks: Send + Sync {
    /// Called once, after the pool reached `Stopped`
    fn on_pool_stop(&self, graceful: bool) {
        let _ = graceful;
    }

    /// Called from the dispatcher right after a worker was spawned
    fn on_worker_start(&self, id: usize) {
        let _ = id;
    }

    /// Called from a retiring worker after it left its loop
    fn on_worker_stop(&self, id: usize) {
        let _ = id;
    }

    /// Called from a worker when a task returned an error or panicked
    fn on_task_failure(&self, task_id: &TaskId, error: &PoolError) {
        let _ = (task_id, error);
    }
}
