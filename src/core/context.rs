//! Deadline- and cancellation-bearing context for blocking pool operations
//!
//! [`WorkerPool::pause`](crate::WorkerPool::pause) and
//! [`WorkerPool::flush`](crate::WorkerPool::flush) block the caller. A
//! [`Context`] bounds that wait: the call returns as soon as the context is
//! cancelled or its deadline passes, leaving the pool state untouched.
//!
//! # Example
//!
//! ```rust
//! use turbo_pool::Context;
//! use std::time::Duration;
//!
//! let parent = Context::background();
//! let child = parent.child_with_timeout(Duration::from_secs(30));
//!
//! // Cancelling the parent cancels every child
//! parent.cancel();
//! assert!(child.is_done());
//! ```

use crate::core::error::PoolError;
use crossbeam_channel::{self as channel, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Why a context is done
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextError {
    /// Explicitly cancelled via [`Context::cancel`], directly or through a parent
    Cancelled,
    /// The deadline passed
    DeadlineExceeded,
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextError::Cancelled => write!(f, "context cancelled"),
            ContextError::DeadlineExceeded => write!(f, "context deadline exceeded"),
        }
    }
}

struct ContextInner {
    cancelled: AtomicBool,
    /// Dropped on cancel, which wakes every receiver of `done_rx`
    done_tx: Mutex<Option<Sender<()>>>,
    done_rx: Receiver<()>,
    deadline: Option<Instant>,
    /// Child contexts (weak references to avoid cycles)
    children: Mutex<Vec<Weak<ContextInner>>>,
}

impl ContextInner {
    fn new(deadline: Option<Instant>) -> Arc<Self> {
        let (done_tx, done_rx) = channel::bounded(0);
        Arc::new(Self {
            cancelled: AtomicBool::new(false),
            done_tx: Mutex::new(Some(done_tx)),
            done_rx,
            deadline,
            children: Mutex::new(Vec::new()),
        })
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        drop(self.done_tx.lock().take());

        let children = std::mem::take(&mut *self.children.lock());
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}

/// A cloneable handle carrying an optional deadline and a cancel signal
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.inner.deadline)
            .field("err", &self.err())
            .finish()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A context without deadline that is only done once cancelled
    pub fn background() -> Self {
        Self {
            inner: ContextInner::new(None),
        }
    }

    /// A context that expires after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A context that expires at `deadline`
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            inner: ContextInner::new(Some(deadline)),
        }
    }

    /// Creates a child context linked to this parent
    ///
    /// The child inherits the parent's deadline and is cancelled together with
    /// the parent. If the parent is already cancelled, so is the child.
    pub fn child(&self) -> Self {
        self.child_with_deadline(self.inner.deadline)
    }

    /// Creates a child context that also expires after `timeout`
    ///
    /// The earlier of the parent's deadline and `now + timeout` wins.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        self.child_with_deadline(Some(Instant::now() + timeout))
    }

    fn child_with_deadline(&self, deadline: Option<Instant>) -> Self {
        let deadline = match (self.inner.deadline, deadline) {
            (Some(parent), Some(own)) => Some(parent.min(own)),
            (parent, own) => parent.or(own),
        };
        let child = Self {
            inner: ContextInner::new(deadline),
        };

        self.inner
            .children
            .lock()
            .push(Arc::downgrade(&child.inner));

        if self.inner.cancelled.load(Ordering::Acquire) {
            child.inner.cancel();
        }
        child
    }

    /// Cancel this context and all of its children
    ///
    /// Idempotent; only the first call has an effect.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// The instant after which the context is done, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Why the context is done, or `None` while it is still live
    pub fn err(&self) -> Option<ContextError> {
        if self.inner.cancelled.load(Ordering::Acquire) {
            Some(ContextError::Cancelled)
        } else if self.inner.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(ContextError::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Whether the context was cancelled or its deadline passed
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Becomes ready (disconnected) when the context is cancelled
    pub(crate) fn cancelled(&self) -> &Receiver<()> {
        &self.inner.done_rx
    }

    /// Fires once at the deadline; never fires without one
    pub(crate) fn expiry(&self) -> Receiver<Instant> {
        match self.inner.deadline {
            Some(deadline) => channel::at(deadline),
            None => channel::never(),
        }
    }

    /// The error to report when `operation` was interrupted by this context
    pub(crate) fn interrupted(&self, operation: &'static str) -> PoolError {
        match self.err() {
            Some(ContextError::Cancelled) => PoolError::cancelled(operation),
            _ => PoolError::deadline_exceeded(operation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_background_is_live_until_cancelled() {
        let ctx = Context::background();
        assert!(!ctx.is_done());
        assert!(ctx.deadline().is_none());
        assert_eq!(
            ctx.cancelled().try_recv(),
            Err(channel::TryRecvError::Empty)
        );

        ctx.cancel();
        ctx.cancel();
        assert_eq!(ctx.err(), Some(ContextError::Cancelled));
        assert_eq!(
            ctx.cancelled().try_recv(),
            Err(channel::TryRecvError::Disconnected)
        );
    }

    #[test]
    fn test_timeout_expires() {
        let ctx = Context::with_timeout(Duration::from_millis(20));
        assert!(!ctx.is_done());

        thread::sleep(Duration::from_millis(40));
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
        assert!(matches!(
            ctx.interrupted("flush"),
            PoolError::DeadlineExceeded { operation: "flush" }
        ));
    }

    #[test]
    fn test_expiry_channel_fires_at_deadline() {
        let ctx = Context::with_timeout(Duration::from_millis(10));
        let start = Instant::now();
        ctx.expiry()
            .recv_timeout(Duration::from_secs(1))
            .expect("expiry should fire");
        assert!(start.elapsed() >= Duration::from_millis(9));

        let ctx = Context::background();
        assert!(ctx
            .expiry()
            .recv_timeout(Duration::from_millis(10))
            .is_err());
    }

    #[test]
    fn test_parent_cancel_propagates_to_children() {
        let parent = Context::background();
        let child = parent.child();
        let grandchild = child.child_with_timeout(Duration::from_secs(60));

        parent.cancel();
        assert!(child.is_done());
        assert_eq!(grandchild.err(), Some(ContextError::Cancelled));
        assert!(matches!(
            grandchild.interrupted("pause"),
            PoolError::Cancelled { operation: "pause" }
        ));
    }

    #[test]
    fn test_child_of_cancelled_parent_starts_cancelled() {
        let parent = Context::background();
        parent.cancel();
        assert!(parent.child().is_done());
    }

    #[test]
    fn test_child_keeps_earlier_deadline() {
        let parent = Context::with_timeout(Duration::from_millis(50));
        let child = parent.child_with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());

        let parent = Context::background();
        let child = parent.child_with_timeout(Duration::from_millis(50));
        assert!(child.deadline().is_some());
    }
}
