//! State shared between the façade, the dispatcher and the workers

use crate::core::PoolHooks;
use crate::pool::pending::PendingTasks;
use crate::pool::stats::PoolCounters;
use crate::pool::worker::panic_message;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(crate) struct PoolShared {
    /// Set once when stop is requested; read by `enqueue` for fast rejection
    closed: AtomicBool,
    /// Stop mode, written once before the stop signal fires
    graceful: AtomicBool,
    pub(crate) counters: PoolCounters,
    pub(crate) pending: PendingTasks,
    hooks: Option<Arc<dyn PoolHooks>>,
}

impl PoolShared {
    pub(crate) fn new(max_workers: usize, hooks: Option<Arc<dyn PoolHooks>>) -> Self {
        Self {
            closed: AtomicBool::new(false),
            graceful: AtomicBool::new(true),
            counters: PoolCounters::new(max_workers),
            pending: PendingTasks::new(),
            hooks,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Record the stop request; must happen before the stop signal fires
    pub(crate) fn close(&self, graceful: bool) {
        self.graceful.store(graceful, Ordering::Release);
        self.closed.store(true, Ordering::Release);
    }

    pub(crate) fn graceful(&self) -> bool {
        self.graceful.load(Ordering::Acquire)
    }

    pub(crate) fn hooks(&self) -> Option<&dyn PoolHooks> {
        self.hooks.as_deref()
    }

    /// Invoke a hook, containing any panic it raises
    ///
    /// A panicking hook is logged and otherwise ignored, so the calling
    /// worker or dispatcher keeps its bookkeeping consistent.
    pub(crate) fn run_hook(&self, name: &str, call: impl FnOnce(&dyn PoolHooks)) {
        let Some(hooks) = self.hooks() else {
            return;
        };
        if let Err(panic_info) = catch_unwind(AssertUnwindSafe(|| call(hooks))) {
            log::error!(
                "hook {} panicked: {}",
                name,
                panic_message(panic_info.as_ref())
            );
        }
    }
}
