//! Pool configuration

use crate::core::{PoolError, PoolHooks, Result};
use std::sync::Arc;
use std::time::Duration;

/// Default interval at which the dispatcher looks for idle workers to retire
pub const DEFAULT_IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration for a worker pool, applied before the dispatcher starts
#[derive(Clone)]
pub struct PoolConfig {
    /// Ceiling on concurrently active workers (0 is clamped to 1)
    pub max_workers: usize,
    /// Workers kept alive when scaling down idle workers.
    /// Default: 1
    pub min_workers: usize,
    /// How often the dispatcher checks for idle workers. A worker idle for at
    /// least one full interval is eligible for retirement.
    /// Default: 10s
    pub idle_check_interval: Duration,
    /// Thread name prefix for workers; the dispatcher is `<prefix>-dispatcher`
    pub thread_name_prefix: String,
    /// Lifecycle callbacks
    hooks: Option<Arc<dyn PoolHooks>>,
}

impl std::fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolConfig")
            .field("max_workers", &self.max_workers)
            .field("min_workers", &self.min_workers)
            .field("idle_check_interval", &self.idle_check_interval)
            .field("thread_name_prefix", &self.thread_name_prefix)
            .field("hooks", &self.hooks.as_ref().map(|_| "<hooks>"))
            .finish()
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get(),
            min_workers: 1,
            idle_check_interval: DEFAULT_IDLE_CHECK_INTERVAL,
            thread_name_prefix: "turbo-worker".to_string(),
            hooks: None,
        }
    }
}

impl PoolConfig {
    /// Create a new configuration with the given worker ceiling
    #[must_use]
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            ..Default::default()
        }
    }

    /// Set the number of workers kept alive when scaling down
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_min_workers(mut self, min_workers: usize) -> Self {
        self.min_workers = min_workers;
        self
    }

    /// Set the idle-check interval.
    ///
    /// # Trade-offs
    ///
    /// - **Shorter intervals**: idle workers are released sooner, bursts pay
    ///   the thread spawn cost more often
    /// - **Longer intervals**: threads linger after a burst
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_idle_check_interval(mut self, interval: Duration) -> Self {
        self.idle_check_interval = interval;
        self
    }

    /// Set thread name prefix
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Register lifecycle callbacks
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_hooks(mut self, hooks: Arc<dyn PoolHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub(crate) fn hooks(&self) -> Option<&Arc<dyn PoolHooks>> {
        self.hooks.as_ref()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.idle_check_interval.is_zero() {
            return Err(PoolError::invalid_config(
                "idle_check_interval",
                "Idle check interval must be non-zero",
            ));
        }
        if self.thread_name_prefix.contains('\0') {
            return Err(PoolError::invalid_config(
                "thread_name_prefix",
                "Thread names cannot contain NUL bytes",
            ));
        }
        Ok(())
    }

    /// The configuration with out-of-range values clamped
    pub(crate) fn normalized(mut self) -> Self {
        self.max_workers = self.max_workers.max(1);
        self
    }
}
