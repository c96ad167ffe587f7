//! Priority lane example
//!
//! Tasks submitted while the pool is paused wait in the priority lane and are
//! handed out highest priority first once the pool resumes.
//!
//! Run with: cargo run --example priority_lane

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use turbo_pool::prelude::*;

fn main() -> Result<()> {
    env_logger::init();
    println!("=== Turbo Pool - Priority Lane Example ===\n");

    let pool = WorkerPool::new(1)?;
    pool.pause(&Context::with_timeout(Duration::from_secs(1)))?;
    println!("1. Pool paused: {:?}", pool.state());

    let order = Arc::new(Mutex::new(Vec::new()));
    let jobs = [
        ("cleanup", Priority::LOW),
        ("report", Priority::NORMAL),
        ("alert", Priority::CRITICAL),
        ("index", Priority::HIGH),
        ("archive", Priority::LOW),
    ];

    println!("\n2. Submitting while paused:");
    for (name, priority) in jobs {
        println!("   {} (priority {})", name, priority.value());
        let order = Arc::clone(&order);
        pool.enqueue_with_priority(move || order.lock().push(name), priority)?;
    }

    println!("\n3. Resuming; execution order:");
    pool.resume()?;
    pool.flush(&Context::with_timeout(Duration::from_secs(5)))?;
    for (i, name) in order.lock().iter().enumerate() {
        println!("   {}. {}", i + 1, name);
    }

    println!("\n4. Resizing to 4 workers: applied {}", pool.resize(4)?);

    pool.stop(true);
    println!("\n=== Example completed successfully ===");
    Ok(())
}
