//! Task type and the internal work item protocol

use crate::core::priority::Priority;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Error type a fallible task body may return
pub type TaskError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Outcome of running a task body
pub type TaskOutcome = std::result::Result<(), TaskError>;

/// A boxed task body that can be sent across threads
pub type TaskFn = Box<dyn FnOnce() -> TaskOutcome + Send + 'static>;

/// A unit of work submitted to the pool.
///
/// A task is run exactly once by the worker that dequeues it. The empty task
/// (`Task::default()`) carries no body; it is reserved for retiring workers and
/// is rejected by [`WorkerPool::enqueue`](crate::WorkerPool::enqueue).
///
/// Any `FnOnce() + Send + 'static` closure converts into a task:
///
/// ```rust
/// use turbo_pool::Task;
///
/// let task: Task = (|| println!("hello")).into();
/// assert!(!task.is_empty());
/// assert!(Task::default().is_empty());
/// ```
#[derive(Default)]
pub struct Task {
    body: Option<TaskFn>,
}

impl Task {
    /// Wrap an infallible closure
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            body: Some(Box::new(move || {
                f();
                Ok(())
            })),
        }
    }

    /// Wrap a closure whose error is reported through
    /// [`PoolHooks::on_task_failure`](crate::PoolHooks::on_task_failure)
    pub fn fallible<F, E>(f: F) -> Self
    where
        F: FnOnce() -> std::result::Result<(), E> + Send + 'static,
        E: Into<TaskError>,
    {
        Self {
            body: Some(Box::new(move || f().map_err(Into::into))),
        }
    }

    /// Whether this is the empty retirement sentinel
    pub fn is_empty(&self) -> bool {
        self.body.is_none()
    }

    pub(crate) fn from_body(body: TaskFn) -> Self {
        Self { body: Some(body) }
    }

    pub(crate) fn into_body(self) -> Option<TaskFn> {
        self.body
    }
}

impl<F> From<F> for Task
where
    F: FnOnce() + Send + 'static,
{
    fn from(f: F) -> Self {
        Task::new(f)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "Task(<empty>)")
        } else {
            write!(f, "Task(<fn>)")
        }
    }
}

/// Opaque identifier assigned to a task when it is enqueued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// A task accepted by the pool, owned by exactly one worker once dispatched
pub(crate) struct QueuedTask {
    pub(crate) id: TaskId,
    pub(crate) priority: Priority,
    pub(crate) body: TaskFn,
}

impl QueuedTask {
    pub(crate) fn new(id: TaskId, priority: Priority, body: TaskFn) -> Self {
        Self { id, priority, body }
    }
}

impl fmt::Debug for QueuedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedTask")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Message carried by the shared worker queue
#[derive(Debug)]
pub(crate) enum WorkItem {
    /// Run a task, then keep listening
    Run(QueuedTask),
    /// Leave the loop and retire
    Retire,
}
