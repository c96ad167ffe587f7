//! Worker thread implementation

use crate::core::task::{QueuedTask, WorkItem};
use crate::core::PoolError;
use crate::pool::shared::PoolShared;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use tracing::{span, Level};

#[derive(Debug, Clone, Copy)]
struct ActivityState {
    busy: bool,
    last_active: Instant,
}

/// Busy/idle bookkeeping the dispatcher consults when scaling down
#[derive(Debug)]
pub(crate) struct WorkerActivity {
    state: Mutex<ActivityState>,
    tasks_run: AtomicU64,
}

impl WorkerActivity {
    fn new() -> Self {
        Self {
            state: Mutex::new(ActivityState {
                busy: true,
                last_active: Instant::now(),
            }),
            tasks_run: AtomicU64::new(0),
        }
    }

    fn mark_busy(&self) {
        self.state.lock().busy = true;
    }

    fn mark_idle(&self) {
        let mut state = self.state.lock();
        state.busy = false;
        state.last_active = Instant::now();
    }

    /// How long the worker has been waiting for work, `None` while busy
    pub(crate) fn idle_for(&self, now: Instant) -> Option<Duration> {
        let state = *self.state.lock();
        (!state.busy).then(|| now.saturating_duration_since(state.last_active))
    }

    pub(crate) fn tasks_run(&self) -> u64 {
        self.tasks_run.load(Ordering::Relaxed)
    }
}

/// A worker that could not be started, with the task it was bound to
pub(crate) struct SpawnFailure {
    pub(crate) error: PoolError,
    pub(crate) task: Option<QueuedTask>,
}

/// Handle to a worker thread, owned by the dispatcher
#[derive(Debug)]
pub(crate) struct Worker {
    id: usize,
    thread: Option<thread::JoinHandle<()>>,
    activity: Arc<WorkerActivity>,
}

impl Worker {
    /// Start a worker that runs `first` and then serves the shared queue
    ///
    /// The worker leaves its loop on [`WorkItem::Retire`], fires
    /// `on_worker_stop` and reports its id on `retired`.
    pub(crate) fn spawn(
        id: usize,
        first: QueuedTask,
        queue: Receiver<WorkItem>,
        retired: Sender<usize>,
        shared: Arc<PoolShared>,
        name_prefix: &str,
    ) -> std::result::Result<Self, SpawnFailure> {
        let activity = Arc::new(WorkerActivity::new());
        let activity_clone = Arc::clone(&activity);
        // Lets the task be recovered if the thread never starts
        let slot = Arc::new(Mutex::new(Some(first)));
        let slot_clone = Arc::clone(&slot);

        let spawned = thread::Builder::new()
            .name(format!("{}-{}", name_prefix, id))
            .spawn(move || {
                let first = slot_clone.lock().take();
                Self::run(id, first, queue, retired, shared, activity_clone);
            });

        match spawned {
            Ok(thread) => Ok(Self {
                id,
                thread: Some(thread),
                activity,
            }),
            Err(e) => Err(SpawnFailure {
                error: PoolError::spawn_with_source(id, "cannot create worker thread", e),
                task: slot.lock().take(),
            }),
        }
    }

    /// Get worker ID
    pub(crate) fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn activity(&self) -> &WorkerActivity {
        &self.activity
    }

    /// Join the worker thread
    pub(crate) fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if let Err(panic_info) = thread.join() {
                log::error!(
                    "worker {} terminated abnormally: {}",
                    self.id,
                    panic_message(panic_info.as_ref())
                );
            }
        }
    }

    /// Main worker loop
    fn run(
        id: usize,
        first: Option<QueuedTask>,
        queue: Receiver<WorkItem>,
        retired: Sender<usize>,
        shared: Arc<PoolShared>,
        activity: Arc<WorkerActivity>,
    ) {
        #[cfg(feature = "tracing")]
        let worker_span = span!(Level::DEBUG, "worker", id = id);
        #[cfg(feature = "tracing")]
        let _guard = worker_span.enter();

        log::debug!("worker {} started", id);

        let mut next = first.map(WorkItem::Run);
        loop {
            let item = match next.take() {
                Some(item) => item,
                None => {
                    activity.mark_idle();
                    match queue.recv() {
                        Ok(item) => item,
                        // Dispatcher is gone; nothing more will arrive
                        Err(_) => break,
                    }
                }
            };

            match item {
                WorkItem::Run(task) => {
                    activity.mark_busy();
                    activity.tasks_run.fetch_add(1, Ordering::Relaxed);
                    Self::execute_task(id, task, &shared);
                }
                WorkItem::Retire => break,
            }
        }

        log::debug!(
            "worker {} retiring after {} tasks",
            id,
            activity.tasks_run()
        );
        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_worker_stop(id, activity.tasks_run());

        shared.counters.record_retire();
        shared.run_hook("on_worker_stop", |hooks| hooks.on_worker_stop(id));
        let _ = retired.send(id);
    }

    /// Execute a single task with panic protection
    fn execute_task(worker_id: usize, task: QueuedTask, shared: &PoolShared) {
        let QueuedTask { id, body, .. } = task;

        #[cfg(feature = "tracing")]
        let task_span = span!(Level::DEBUG, "task_execution", task_id = %id);
        #[cfg(feature = "tracing")]
        let _task_guard = task_span.enter();

        let start = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(body));
        #[allow(unused_variables)]
        let elapsed = start.elapsed();

        let failure = match outcome {
            Ok(Ok(())) => {
                shared.counters.record_completed();
                #[cfg(feature = "tracing")]
                crate::tracing::metrics::record_completion(elapsed, true);
                None
            }
            Ok(Err(e)) => {
                log::warn!("worker {}: task {} failed: {}", worker_id, id, e);
                shared.counters.record_failed();
                #[cfg(feature = "tracing")]
                crate::tracing::metrics::record_completion(elapsed, false);
                Some(PoolError::task_failed(id.to_string(), e.to_string()))
            }
            Err(panic_info) => {
                let message = panic_message(panic_info.as_ref());
                log::error!("worker {}: task {} panicked: {}", worker_id, id, message);
                shared.counters.record_panicked();
                #[cfg(feature = "tracing")]
                crate::tracing::metrics::record_panic(elapsed);
                Some(PoolError::task_panicked(id.to_string(), worker_id, message))
            }
        };

        shared.pending.done();
        if let Some(error) = failure {
            shared.run_hook("on_task_failure", |hooks| hooks.on_task_failure(&id, &error));
        }
    }
}

pub(crate) fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
