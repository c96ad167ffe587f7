//! Error types for the worker pool

/// Result type for worker pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors that can occur in the worker pool
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The pool was stopped; no new work or control requests are accepted
    #[error("worker pool is closed")]
    Closed,

    /// The caller submitted the empty task, which is reserved for worker retirement
    #[error("invalid task: the empty task is reserved for worker retirement")]
    InvalidTask,

    /// A context deadline elapsed before the operation completed
    #[error("{operation} did not complete before the context deadline")]
    DeadlineExceeded {
        /// Name of the interrupted operation
        operation: &'static str,
    },

    /// A context was cancelled before the operation completed
    #[error("{operation} was cancelled")]
    Cancelled {
        /// Name of the interrupted operation
        operation: &'static str,
    },

    /// A task body returned an error
    #[error("task {task_id} failed: {message}")]
    TaskFailed {
        /// ID of the failed task
        task_id: String,
        /// Error message
        message: String,
    },

    /// A task body panicked
    #[error("task {task_id} panicked on worker #{worker_id}: {message}")]
    TaskPanicked {
        /// ID of the panicked task
        task_id: String,
        /// ID of the worker that contained the panic
        worker_id: usize,
        /// Panic message
        message: String,
    },

    /// Failed to spawn a pool thread
    #[error("failed to spawn worker #{worker_id}: {message}")]
    SpawnError {
        /// ID of the worker that failed to spawn (0 for the dispatcher)
        worker_id: usize,
        /// Error message
        message: String,
        /// Source IO error
        #[source]
        source: Option<std::io::Error>,
    },

    /// Invalid configuration with parameter
    #[error("invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Configuration parameter name
        parameter: String,
        /// Error message
        message: String,
    },
}

impl PoolError {
    /// Create a deadline exceeded error
    pub fn deadline_exceeded(operation: &'static str) -> Self {
        PoolError::DeadlineExceeded { operation }
    }

    /// Create a cancelled error
    pub fn cancelled(operation: &'static str) -> Self {
        PoolError::Cancelled { operation }
    }

    /// Create a task failure error
    pub fn task_failed(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        PoolError::TaskFailed {
            task_id: task_id.into(),
            message: message.into(),
        }
    }

    /// Create a task panic error
    pub fn task_panicked(
        task_id: impl Into<String>,
        worker_id: usize,
        message: impl Into<String>,
    ) -> Self {
        PoolError::TaskPanicked {
            task_id: task_id.into(),
            worker_id,
            message: message.into(),
        }
    }

    /// Create a spawn error with source
    pub fn spawn_with_source(
        worker_id: usize,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        PoolError::SpawnError {
            worker_id,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        PoolError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Whether this error describes a task body failure rather than a pool-control failure
    pub fn is_task_failure(&self) -> bool {
        matches!(
            self,
            PoolError::TaskFailed { .. } | PoolError::TaskPanicked { .. }
        )
    }
}
