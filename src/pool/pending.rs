//! Count of accepted tasks that have not finished yet, with drain notifications

use crossbeam_channel::{self as channel, Receiver, Sender};
use parking_lot::Mutex;

#[derive(Default)]
struct PendingState {
    count: usize,
    /// Dropped when `count` reaches zero, waking every flush waiting on it
    waiters: Vec<Sender<()>>,
}

/// Tasks accepted by `enqueue` and not yet executed or discarded
#[derive(Default)]
pub(crate) struct PendingTasks {
    state: Mutex<PendingState>,
}

impl PendingTasks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self) {
        self.state.lock().count += 1;
    }

    pub(crate) fn done(&self) {
        let mut state = self.state.lock();
        state.count = state.count.saturating_sub(1);
        if state.count == 0 {
            state.waiters.clear();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().count
    }

    /// A receiver that disconnects once the count reaches zero, or `None` if it
    /// already is zero
    pub(crate) fn drained(&self) -> Option<Receiver<()>> {
        let mut state = self.state.lock();
        if state.count == 0 {
            return None;
        }
        let (tx, rx) = channel::bounded(0);
        state.waiters.push(tx);
        Some(rx)
    }
}
