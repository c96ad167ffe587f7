//! Basic worker pool usage example
//!
//! Demonstrates pool creation, task submission, idle scale-down and
//! statistics.
//!
//! Run with: cargo run --example basic_usage

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use turbo_pool::prelude::*;

struct PrintHooks;

impl PoolHooks for PrintHooks {
    fn on_worker_start(&self, id: usize) {
        println!("   [hook] worker {} started", id);
    }

    fn on_worker_stop(&self, id: usize) {
        println!("   [hook] worker {} stopped", id);
    }

    fn on_task_failure(&self, task_id: &TaskId, error: &PoolError) {
        println!("   [hook] task {} failed: {}", task_id, error);
    }

    fn on_pool_stop(&self, graceful: bool) {
        println!("   [hook] pool stopped (graceful: {})", graceful);
    }
}

fn main() -> Result<()> {
    env_logger::init();
    println!("=== Turbo Pool - Basic Usage Example ===\n");

    let config = PoolConfig::new(4)
        .with_idle_check_interval(Duration::from_millis(200))
        .with_hooks(Arc::new(PrintHooks));
    let pool = WorkerPool::with_config(config)?;

    println!("1. Submitting 10 tasks to a pool of at most {} workers:", pool.max_workers());
    for i in 0..10 {
        pool.enqueue(move || {
            println!("   Task {} executing on {:?}", i, thread::current().name());
            thread::sleep(Duration::from_millis(50));
        })?;
    }

    println!("\n2. A failing task and a panicking task:");
    pool.enqueue(Task::fallible(|| Err::<(), _>("record 17 is malformed")))?;
    pool.enqueue(Task::new(|| panic!("unexpected state")))?;

    pool.flush(&Context::with_timeout(Duration::from_secs(5)))?;
    println!("\n3. After flush: {} workers", pool.current_workers());

    thread::sleep(Duration::from_millis(700));
    println!("4. After idling: {} workers", pool.current_workers());

    println!("\n5. Statistics:");
    let stats = pool.stats();
    println!("   Submitted: {}", stats.tasks_submitted);
    println!("   Completed: {}", stats.tasks_completed);
    println!("   Failed:    {}", stats.tasks_failed);
    println!("   Panicked:  {}", stats.tasks_panicked);
    println!("   Peak workers: {}", stats.peak_workers);

    println!("\n6. Stopping:");
    pool.stop(true);

    println!("\n=== Example completed successfully ===");
    Ok(())
}
