//! Property-based tests for turbo_pool using proptest

use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use turbo_pool::prelude::*;

// ============================================================================
// PoolConfig Tests
// ============================================================================

proptest! {
    /// The ceiling is always at least one
    #[test]
    fn test_config_ceiling_clamped(max_workers in 0usize..64) {
        let config = PoolConfig::new(max_workers);
        prop_assert_eq!(config.max_workers, max_workers.max(1));
    }

    /// Any non-zero interval and plain prefix validates
    #[test]
    fn test_config_validates(
        max_workers in 1usize..16,
        min_workers in 0usize..4,
        interval_ms in 1u64..10_000,
        prefix in "[a-z]{3,10}"
    ) {
        let config = PoolConfig::new(max_workers)
            .with_min_workers(min_workers)
            .with_idle_check_interval(Duration::from_millis(interval_ms))
            .with_thread_name_prefix(prefix);

        prop_assert!(config.validate().is_ok());
    }
}

// ============================================================================
// Scheduling Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Never more workers than the ceiling, and every task runs exactly once
    #[test]
    fn test_ceiling_never_exceeded(max_workers in 1usize..6, task_count in 1usize..40) {
        let pool = WorkerPool::new(max_workers).expect("Failed to create pool");
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..task_count {
            let counter = Arc::clone(&counter);
            pool.enqueue(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            })
            .expect("Failed to enqueue task");
            prop_assert!(pool.current_workers() <= max_workers);
        }

        pool.stop(true);
        prop_assert_eq!(counter.load(Ordering::Relaxed), task_count);

        let stats = pool.stats();
        prop_assert!(stats.peak_workers <= max_workers);
        prop_assert_eq!(stats.tasks_completed as usize, task_count);
        prop_assert_eq!(stats.current_workers, 0);
    }

    /// resize(n) applies max(n, 1)
    #[test]
    fn test_resize_clamps(sizes in prop::collection::vec(0usize..16, 1..6)) {
        let pool = WorkerPool::new(2).expect("Failed to create pool");

        for size in sizes {
            let applied = pool.resize(size).expect("Failed to resize");
            prop_assert_eq!(applied, size.max(1));
            prop_assert_eq!(pool.max_workers(), size.max(1));
        }
    }

    /// Paused tasks run in priority order, FIFO within a priority
    #[test]
    fn test_priority_order_on_resume(priorities in prop::collection::vec(-5i32..5, 1..12)) {
        let pool = WorkerPool::new(1).expect("Failed to create pool");
        pool.pause(&Context::with_timeout(Duration::from_secs(5)))
            .expect("Failed to pause");

        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for (index, priority) in priorities.iter().copied().enumerate() {
            let order = Arc::clone(&order);
            pool.enqueue_with_priority(move || order.lock().push(index), Priority(priority))
                .expect("Failed to enqueue task");
        }

        pool.resume().expect("Failed to resume");
        pool.flush(&Context::with_timeout(Duration::from_secs(5)))
            .expect("Pool should drain");

        let mut expected: Vec<usize> = (0..priorities.len()).collect();
        // Stable sort keeps arrival order within a priority
        expected.sort_by_key(|&index| std::cmp::Reverse(priorities[index]));
        prop_assert_eq!(order.lock().clone(), expected);
    }
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Stopping is always safe, in either mode and any number of times
    #[test]
    fn test_repeated_stop_safe(max_workers in 1usize..4, modes in prop::collection::vec(any::<bool>(), 1..4)) {
        let pool = WorkerPool::new(max_workers).expect("Failed to create pool");
        pool.enqueue(|| {}).expect("Failed to enqueue task");

        for graceful in modes {
            pool.stop(graceful);
            prop_assert_eq!(pool.state(), PoolState::Stopped);
        }
        let result = pool.enqueue(|| {});
        prop_assert!(matches!(result, Err(PoolError::Closed)));
    }
}
