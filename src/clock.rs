//! Wall-clock time and deferred one-shot callbacks.
//!
//! Both are traits so the notice timers can run against simulated time in tests.

use log::warn;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A deferred task, run at most once.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait Clock: Send + Sync {
    /// Current time in Unix epoch milliseconds.
    fn now_ms(&self) -> i64;
}

pub trait Scheduler: Send + Sync {
    /// Run `task` once after `delay`, on a context other than the caller's.
    fn schedule(&self, delay: Duration, task: Task);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|d| i64::try_from(d.as_millis()).ok())
            .unwrap_or(0)
    }
}

/// Fires each task on its own short-lived thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadScheduler;

impl Scheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        let spawned = thread::Builder::new()
            .name("zensta-timer".into())
            .spawn(move || {
                thread::sleep(delay);
                task();
            });

        if let Err(e) = spawned {
            warn!("Failed to spawn timer thread: {e}");
        }
    }
}
