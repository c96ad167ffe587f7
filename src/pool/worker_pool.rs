//! The worker pool façade

use crate::core::task::{QueuedTask, TaskFn};
use crate::core::{Context, PoolError, Priority, Result, Task, TaskId};
use crate::pool::config::PoolConfig;
use crate::pool::dispatcher::{Control, ControlRequest, Dispatcher, DispatcherChannels};
use crate::pool::shared::PoolShared;
use crate::pool::stats::{PoolState, PoolStats};
use crossbeam_channel::{self as channel, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;

/// A bounded, dynamically sized pool of worker threads.
///
/// Workers are spawned on demand up to `max_workers` and retired again once
/// they have been idle for a full idle-check interval. All scheduling state
/// lives on a single dispatcher thread; the pool itself is a thin, `Sync`
/// handle that can be shared behind an `Arc`.
///
/// Dropping the pool performs a graceful [`stop`](Self::stop).
///
/// # Example
///
/// ```rust
/// use turbo_pool::prelude::*;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// # fn main() -> Result<()> {
/// let pool = WorkerPool::new(4)?;
/// let counter = Arc::new(AtomicUsize::new(0));
///
/// for _ in 0..10 {
///     let counter = Arc::clone(&counter);
///     pool.enqueue(move || {
///         counter.fetch_add(1, Ordering::Relaxed);
///     })?;
/// }
///
/// pool.stop(true);
/// assert_eq!(counter.load(Ordering::Relaxed), 10);
/// # Ok(())
/// # }
/// ```
pub struct WorkerPool {
    name: String,
    shared: Arc<PoolShared>,
    submit_tx: Sender<QueuedTask>,
    control_tx: Sender<ControlRequest>,
    /// Taken and dropped by the first `stop`
    stop_tx: Mutex<Option<Sender<()>>>,
    stop_rx: Receiver<()>,
    finalize_rx: Receiver<()>,
    dispatcher: Mutex<Option<thread::JoinHandle<()>>>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("max_workers", &self.max_workers())
            .field("current_workers", &self.current_workers())
            .field("pending", &self.pending())
            .finish()
    }
}

impl WorkerPool {
    /// Create a pool with the given worker ceiling and default settings
    pub fn new(max_workers: usize) -> Result<Self> {
        Self::with_config(PoolConfig::new(max_workers))
    }

    /// Create a pool with custom configuration
    ///
    /// The dispatcher thread starts immediately; the pool is `Running` when
    /// this returns. No worker exists until the first task arrives.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        let config = config.normalized();

        let shared = Arc::new(PoolShared::new(config.max_workers, config.hooks().cloned()));
        let (submit_tx, submissions) = channel::bounded(0);
        let (control_tx, control) = channel::bounded(0);
        let (stop_tx, stop_rx) = channel::bounded(0);
        let (finalize, finalize_rx) = channel::bounded(0);

        let handle = Dispatcher::start(
            &config,
            Arc::clone(&shared),
            DispatcherChannels {
                submissions,
                control,
                stop: stop_rx.clone(),
                finalize,
            },
        )?;

        Ok(Self {
            name: config.thread_name_prefix,
            shared,
            submit_tx,
            control_tx,
            stop_tx: Mutex::new(Some(stop_tx)),
            stop_rx,
            finalize_rx,
            dispatcher: Mutex::new(Some(handle)),
        })
    }

    /// Submit a task at [`Priority::NORMAL`]
    ///
    /// Blocks until the dispatcher accepts the task. While every worker is
    /// busy and a task is already waiting, callers wait here.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidTask`] for the empty task
    /// - [`PoolError::Closed`] once [`stop`](Self::stop) was called
    pub fn enqueue<T: Into<Task>>(&self, task: T) -> Result<TaskId> {
        self.enqueue_with_priority(task, Priority::NORMAL)
    }

    /// Submit a task with a priority
    ///
    /// Priority decides the order in which waiting tasks are handed to
    /// workers: higher first, arrival order within the same priority.
    ///
    /// ```rust
    /// use turbo_pool::prelude::*;
    ///
    /// # fn main() -> Result<()> {
    /// let pool = WorkerPool::new(1)?;
    /// let id = pool.enqueue_with_priority(|| println!("urgent"), Priority::HIGH)?;
    /// println!("submitted {}", id);
    /// # pool.stop(true);
    /// # Ok(())
    /// # }
    /// ```
    pub fn enqueue_with_priority<T: Into<Task>>(
        &self,
        task: T,
        priority: Priority,
    ) -> Result<TaskId> {
        let body = task.into().into_body().ok_or(PoolError::InvalidTask)?;
        if self.shared.is_closed() {
            return Err(PoolError::Closed);
        }

        let id = TaskId::new();
        self.shared.pending.add();
        let queued = QueuedTask::new(id, priority, body);

        channel::select! {
            send(self.submit_tx, queued) -> res => match res {
                Ok(()) => Ok(id),
                Err(_) => {
                    self.shared.pending.done();
                    Err(PoolError::Closed)
                }
            },
            recv(self.stop_rx) -> _ => {
                self.shared.pending.done();
                Err(PoolError::Closed)
            }
        }
    }

    /// Submit a task at [`Priority::NORMAL`] and wait until it has run
    ///
    /// See [`enqueue_wait_with_priority`](Self::enqueue_wait_with_priority).
    pub fn enqueue_wait<T: Into<Task>>(&self, task: T) -> Result<TaskId> {
        self.enqueue_wait_with_priority(task, Priority::NORMAL)
    }

    /// Submit a task with a priority and block until its body has finished.
    ///
    /// A task that fails or panics still counts as processed: the call
    /// returns `Ok` and the failure is reported through
    /// [`PoolHooks::on_task_failure`](crate::PoolHooks::on_task_failure).
    /// Statistics may lag the return by the worker's own bookkeeping.
    ///
    /// Must not be called from inside a task; with every worker busy the
    /// caller would wait on itself.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidTask`] for the empty task
    /// - [`PoolError::Closed`] if the pool is stopped, or if a forceful stop
    ///   discards the task before it runs
    ///
    /// ```rust
    /// use turbo_pool::prelude::*;
    /// use std::sync::atomic::{AtomicBool, Ordering};
    /// use std::sync::Arc;
    ///
    /// # fn main() -> Result<()> {
    /// let pool = WorkerPool::new(2)?;
    /// let done = Arc::new(AtomicBool::new(false));
    /// let flag = Arc::clone(&done);
    ///
    /// pool.enqueue_wait_with_priority(move || flag.store(true, Ordering::SeqCst), Priority::HIGH)?;
    /// assert!(done.load(Ordering::SeqCst));
    /// # pool.stop(true);
    /// # Ok(())
    /// # }
    /// ```
    pub fn enqueue_wait_with_priority<T: Into<Task>>(
        &self,
        task: T,
        priority: Priority,
    ) -> Result<TaskId> {
        let body = task.into().into_body().ok_or(PoolError::InvalidTask)?;
        let (done_tx, done_rx) = channel::bounded(1);
        let wrapped: TaskFn = Box::new(move || {
            let _signal = Completion(done_tx);
            body()
        });

        let id = self.enqueue_with_priority(Task::from_body(wrapped), priority)?;
        match done_rx.recv() {
            Ok(()) => Ok(id),
            // The body was dropped without running
            Err(_) => Err(PoolError::Closed),
        }
    }

    /// Stop the pool and wait until every worker has retired.
    ///
    /// With `graceful = true`, tasks still waiting for a worker run first.
    /// With `graceful = false` they are discarded; tasks already running
    /// always finish.
    ///
    /// Idempotent and safe to call from several threads: every caller
    /// returns once the pool is `Stopped`, and
    /// [`PoolHooks::on_pool_stop`](crate::PoolHooks::on_pool_stop) fires
    /// once. Only the first call decides the mode.
    ///
    /// Must not be called from inside a task or hook.
    pub fn stop(&self, graceful: bool) {
        if let Some(stop_tx) = self.stop_tx.lock().take() {
            log::info!(
                "stopping worker pool '{}' ({})",
                self.name,
                if graceful { "graceful" } else { "forceful" }
            );
            self.shared.close(graceful);
            drop(stop_tx);
        }

        // Disconnects when the dispatcher exits
        let _ = self.finalize_rx.recv();

        if let Some(handle) = self.dispatcher.lock().take() {
            if handle.join().is_err() {
                log::error!("dispatcher of worker pool '{}' panicked", self.name);
            }
        }
    }

    /// Suspend task assignment.
    ///
    /// Running tasks continue, new tasks are accepted and wait in priority
    /// order until [`resume`](Self::resume). If `ctx` is done before the
    /// dispatcher takes the request, the pool state is left unchanged.
    pub fn pause(&self, ctx: &Context) -> Result<()> {
        self.request(Control::Pause, ctx, "pause")
    }

    /// Resume task assignment after [`pause`](Self::pause)
    pub fn resume(&self) -> Result<()> {
        self.request(Control::Resume, &Context::background(), "resume")
    }

    /// Change the worker ceiling and return the value applied.
    ///
    /// `0` is treated as `1`. Lowering the ceiling only throttles future
    /// spawns; workers above it are retired by idle scale-down.
    pub fn resize(&self, max_workers: usize) -> Result<usize> {
        let max_workers = max_workers.max(1);
        self.request(Control::Resize(max_workers), &Context::background(), "resize")?;
        Ok(max_workers)
    }

    /// Block until every accepted task has finished or been discarded.
    ///
    /// Returns early with [`PoolError::DeadlineExceeded`] or
    /// [`PoolError::Cancelled`] when `ctx` is done first; running tasks are
    /// not interrupted. While paused, parked tasks keep the pool from
    /// draining.
    pub fn flush(&self, ctx: &Context) -> Result<()> {
        let Some(drained) = self.shared.pending.drained() else {
            return Ok(());
        };
        if ctx.is_done() {
            return Err(ctx.interrupted("flush"));
        }

        let expiry = ctx.expiry();
        channel::select! {
            recv(drained) -> _ => Ok(()),
            recv(ctx.cancelled()) -> _ => Err(ctx.interrupted("flush")),
            recv(expiry) -> _ => Err(ctx.interrupted("flush")),
        }
    }

    fn request(&self, control: Control, ctx: &Context, operation: &'static str) -> Result<()> {
        if self.shared.is_closed() {
            return Err(PoolError::Closed);
        }
        if ctx.is_done() {
            return Err(ctx.interrupted(operation));
        }

        let (request, applied) = ControlRequest::new(control);
        let expiry = ctx.expiry();
        channel::select! {
            send(self.control_tx, request) -> res => {
                if res.is_err() {
                    return Err(PoolError::Closed);
                }
            },
            recv(self.stop_rx) -> _ => return Err(PoolError::Closed),
            recv(ctx.cancelled()) -> _ => return Err(ctx.interrupted(operation)),
            recv(expiry) -> _ => return Err(ctx.interrupted(operation)),
        }

        // Disconnects once the dispatcher has applied the request
        let _ = applied.recv();
        Ok(())
    }

    /// Current lifecycle state
    pub fn state(&self) -> PoolState {
        self.shared.counters.state()
    }

    /// Snapshot of pool statistics
    pub fn stats(&self) -> PoolStats {
        self.shared.counters.snapshot(self.pending())
    }

    /// Workers counted against the ceiling
    pub fn current_workers(&self) -> usize {
        self.shared.counters.current_workers()
    }

    /// Current worker ceiling
    pub fn max_workers(&self) -> usize {
        self.shared.counters.max_workers()
    }

    /// Tasks accepted and not yet finished or discarded
    pub fn pending(&self) -> usize {
        self.shared.pending.len()
    }

    /// Whether [`stop`](Self::stop) has been called
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

/// Signals its waiter when dropped, including while unwinding from a panic
struct Completion(Sender<()>);

impl Drop for Completion {
    fn drop(&mut self) {
        let _ = self.0.try_send(());
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop(true);
    }
}
