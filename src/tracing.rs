//! Tracing integration for observability.
//!
//! With the `tracing` feature enabled, every worker runs inside a `worker`
//! span and every task inside a `task_execution` span, and the pool emits
//! the metric events in [`metrics`].
//!
//! # Example
//!
//! ```rust,ignore
//! use turbo_pool::prelude::*;
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env()
//!         .add_directive("turbo_pool=debug".parse()?))
//!     .init();
//!
//! let pool = WorkerPool::new(4)?;
//!
//! // Run the task inside the span that is current here
//! pool.enqueue(turbo_pool::tracing::in_current_span(|| {
//!     tracing::info!("runs under the caller's span");
//! }))?;
//! ```

use crate::core::Task;

/// Wrap `f` so that it runs inside the tracing span current at the call.
///
/// Without the `tracing` feature this is a plain [`Task::new`].
pub fn in_current_span<F>(f: F) -> Task
where
    F: FnOnce() + Send + 'static,
{
    #[cfg(feature = "tracing")]
    {
        let span = tracing::Span::current();
        Task::new(move || {
            let _guard = span.enter();
            f();
        })
    }
    #[cfg(not(feature = "tracing"))]
    {
        Task::new(f)
    }
}

/// Metrics recording functions for observability.
///
/// These functions emit tracing events that can be consumed by
/// metrics collection systems like Prometheus via tracing-opentelemetry.
#[cfg(feature = "tracing")]
pub mod metrics {
    use std::time::Duration;

    /// Records a task accepted by the dispatcher.
    #[inline]
    pub fn record_submission(priority: i32, lane_depth: usize) {
        tracing::trace!(
            counter.tasks_submitted = 1,
            gauge.lane_depth = lane_depth as i64,
            priority = priority,
            "task submitted"
        );
    }

    /// Records task completion with timing.
    #[inline]
    pub fn record_completion(duration: Duration, success: bool) {
        let duration_ms = duration.as_millis() as u64;
        if success {
            tracing::trace!(
                counter.tasks_completed = 1,
                histogram.task_duration_ms = duration_ms,
                "task completed"
            );
        } else {
            tracing::trace!(
                counter.tasks_failed = 1,
                histogram.task_duration_ms = duration_ms,
                "task failed"
            );
        }
    }

    /// Records a task panic event.
    #[inline]
    pub fn record_panic(duration: Duration) {
        tracing::trace!(
            counter.tasks_panicked = 1,
            histogram.task_duration_ms = duration.as_millis() as u64,
            "task panicked"
        );
    }

    /// Records a worker spawn.
    #[inline]
    pub fn record_worker_start(worker_id: usize, current_workers: usize) {
        tracing::debug!(
            gauge.current_workers = current_workers as i64,
            worker_id = worker_id,
            "worker started"
        );
    }

    /// Records a worker leaving its loop.
    #[inline]
    pub fn record_worker_stop(worker_id: usize, tasks_run: u64) {
        tracing::debug!(worker_id = worker_id, tasks_run = tasks_run, "worker stopped");
    }

    /// Records idle workers retired by the dispatcher.
    #[inline]
    pub fn record_scale_down(retired: usize, current_workers: usize) {
        tracing::debug!(
            counter.workers_retired = retired as u64,
            gauge.current_workers = current_workers as i64,
            "idle workers retired"
        );
    }

    /// Records pool shutdown.
    #[inline]
    pub fn record_pool_stop(graceful: bool, tasks_completed: u64, tasks_discarded: u64) {
        tracing::info!(
            graceful = graceful,
            tasks_completed = tasks_completed,
            tasks_discarded = tasks_discarded,
            "worker pool stopped"
        );
    }
}
