//! Lifecycle state and pool statistics

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};

/// Lifecycle state of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolState {
    /// Accepting and dispatching tasks
    Running,
    /// Accepting tasks without assigning them to workers
    Paused,
    /// Stop requested; finishing or discarding queued work and retiring workers
    Draining,
    /// Terminal; every worker has retired
    Stopped,
}

impl PoolState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PoolState::Running,
            1 => PoolState::Paused,
            2 => PoolState::Draining,
            _ => PoolState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            PoolState::Running => 0,
            PoolState::Paused => 1,
            PoolState::Draining => 2,
            PoolState::Stopped => 3,
        }
    }
}

/// Counters published by pool threads.
///
/// Worker-count and state fields are written only by the dispatcher; task
/// outcome fields only by workers. Everyone else reads.
#[derive(Debug)]
pub(crate) struct PoolCounters {
    state: AtomicU8,
    max_workers: AtomicUsize,
    current_workers: AtomicUsize,
    peak_workers: AtomicUsize,
    workers_spawned: AtomicU64,
    workers_retired: AtomicU64,
    tasks_submitted: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    tasks_panicked: AtomicU64,
    tasks_discarded: AtomicU64,
}

impl PoolCounters {
    pub(crate) fn new(max_workers: usize) -> Self {
        Self {
            state: AtomicU8::new(PoolState::Running.as_u8()),
            max_workers: AtomicUsize::new(max_workers),
            current_workers: AtomicUsize::new(0),
            peak_workers: AtomicUsize::new(0),
            workers_spawned: AtomicU64::new(0),
            workers_retired: AtomicU64::new(0),
            tasks_submitted: AtomicU64::new(0),
            tasks_completed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            tasks_panicked: AtomicU64::new(0),
            tasks_discarded: AtomicU64::new(0),
        }
    }

    pub(crate) fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: PoolState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    pub(crate) fn max_workers(&self) -> usize {
        self.max_workers.load(Ordering::Acquire)
    }

    pub(crate) fn set_max_workers(&self, max_workers: usize) {
        self.max_workers.store(max_workers, Ordering::Release);
    }

    pub(crate) fn current_workers(&self) -> usize {
        self.current_workers.load(Ordering::Acquire)
    }

    pub(crate) fn set_current_workers(&self, current: usize) {
        self.current_workers.store(current, Ordering::Release);
        self.peak_workers.fetch_max(current, Ordering::AcqRel);
    }

    pub(crate) fn record_spawn(&self) {
        self.workers_spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retire(&self) {
        self.workers_retired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_submission(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_panicked(&self) {
        self.tasks_panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discarded(&self) {
        self.tasks_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, pending: usize) -> PoolStats {
        PoolStats {
            state: self.state(),
            max_workers: self.max_workers(),
            current_workers: self.current_workers(),
            peak_workers: self.peak_workers.load(Ordering::Acquire),
            workers_spawned: self.workers_spawned.load(Ordering::Relaxed),
            workers_retired: self.workers_retired.load(Ordering::Relaxed),
            pending,
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            tasks_panicked: self.tasks_panicked.load(Ordering::Relaxed),
            tasks_discarded: self.tasks_discarded.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Lifecycle state
    pub state: PoolState,
    /// Current worker ceiling
    pub max_workers: usize,
    /// Workers counted against the ceiling
    pub current_workers: usize,
    /// Highest `current_workers` ever observed
    pub peak_workers: usize,
    /// Workers spawned since start
    pub workers_spawned: u64,
    /// Workers that left their loop since start
    pub workers_retired: u64,
    /// Tasks accepted and not yet finished or discarded
    pub pending: usize,
    /// Tasks accepted by the dispatcher
    pub tasks_submitted: u64,
    /// Tasks that ran to completion
    pub tasks_completed: u64,
    /// Tasks whose body returned an error
    pub tasks_failed: u64,
    /// Tasks whose body panicked
    pub tasks_panicked: u64,
    /// Tasks dropped unexecuted by a forceful stop
    pub tasks_discarded: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips_through_atomic() {
        let counters = PoolCounters::new(4);
        assert_eq!(counters.state(), PoolState::Running);

        for state in [
            PoolState::Paused,
            PoolState::Draining,
            PoolState::Stopped,
            PoolState::Running,
        ] {
            counters.set_state(state);
            assert_eq!(counters.state(), state);
        }
    }

    #[test]
    fn test_peak_tracks_highest_worker_count() {
        let counters = PoolCounters::new(8);
        counters.set_current_workers(3);
        counters.set_current_workers(7);
        counters.set_current_workers(2);

        let stats = counters.snapshot(0);
        assert_eq!(stats.current_workers, 2);
        assert_eq!(stats.peak_workers, 7);
        assert_eq!(stats.max_workers, 8);
    }

    #[test]
    fn test_snapshot_counts() {
        let counters = PoolCounters::new(2);
        counters.record_submission();
        counters.record_submission();
        counters.record_completed();
        counters.record_panicked();
        counters.record_spawn();

        let stats = counters.snapshot(1);
        assert_eq!(stats.tasks_submitted, 2);
        assert_eq!(stats.tasks_completed, 1);
        assert_eq!(stats.tasks_panicked, 1);
        assert_eq!(stats.workers_spawned, 1);
        assert_eq!(stats.pending, 1);
    }
}
