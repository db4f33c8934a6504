//! Shared test utilities for Zensta.
//!
//! Temp databases, an in-memory lock store, simulated time and recording
//! fakes for the platform seams. Available to integration tests through the
//! `test-utils` feature.

#![allow(clippy::unwrap_used, reason = "fixtures panic on setup failure")]

use crate::clock::{Clock, Scheduler, Task};
use crate::db::{migrations, Database};
use crate::error::AppError;
use crate::platform::{HomeRedirect, NoticeSurface, NoticeView, Placement, ViewHandle};
use crate::store::{LockEntry, LockStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{tempdir, TempDir};

/// Create a temporary test database with migrations applied.
///
/// Returns a tuple of (Database, TempDir). The TempDir must be kept alive
/// for the duration of the test to prevent the database file from being deleted.
pub fn setup_test_db() -> (Database, TempDir) {
    let dir = tempdir().expect("Failed to create temp directory for test DB");
    let db_path = dir.path().join("test.db");
    let db = Database::open(&db_path).expect("Failed to open test database");
    migrations::run(db.connection()).expect("Failed to run migrations on test DB");
    (db, dir)
}

#[derive(Default)]
pub struct MemoryLockStore {
    locks: Mutex<HashMap<String, LockEntry>>,
}

impl MemoryLockStore {
    pub fn insert(&self, application_id: &str, locked_until_ms: i64, message: Option<&str>) {
        self.locks.lock().unwrap().insert(
            application_id.to_string(),
            LockEntry {
                locked_until_ms,
                message: message.map(str::to_string),
            },
        );
    }
}

impl LockStore for MemoryLockStore {
    fn get(&self, application_id: &str) -> Result<Option<LockEntry>, AppError> {
        Ok(self.locks.lock().unwrap().get(application_id).cloned())
    }
}

pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self(AtomicI64::new(now_ms))
    }

    pub fn set(&self, now_ms: i64) {
        self.0.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

struct Pending {
    due_ms: i64,
    seq: u64,
    task: Task,
}

/// Holds scheduled tasks until `advance` moves simulated time past them.
pub struct ManualScheduler {
    clock: Arc<ManualClock>,
    pending: Mutex<Vec<Pending>>,
    next_seq: AtomicU64,
}

impl ManualScheduler {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            pending: Mutex::new(Vec::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Move time forward by `ms`, running due tasks in deadline order.
    /// Tasks run without any scheduler lock held, so they may schedule more.
    pub fn advance(&self, ms: u64) {
        let target = self.clock.now_ms() + i64::try_from(ms).unwrap();
        loop {
            let next = {
                let mut pending = self.pending.lock().unwrap();
                let index = pending
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.due_ms <= target)
                    .min_by_key(|(_, p)| (p.due_ms, p.seq))
                    .map(|(i, _)| i);
                index.map(|i| pending.remove(i))
            };
            let Some(next) = next else {
                break;
            };
            self.clock.set(next.due_ms.max(self.clock.now_ms()));
            (next.task)();
        }
        self.clock.set(target);
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let due_ms = self.clock.now_ms() + i64::try_from(delay.as_millis()).unwrap();
        self.pending.lock().unwrap().push(Pending { due_ms, seq, task });
    }
}

#[derive(Default)]
pub struct RecordingRedirect(AtomicUsize);

impl RecordingRedirect {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl HomeRedirect for RecordingRedirect {
    fn redirect_to_home(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Tracks attached views and lets tests simulate close clicks and failures.
#[derive(Default)]
pub struct RecordingSurface {
    attached: Mutex<Vec<(ViewHandle, NoticeView)>>,
    clicked: Mutex<Vec<ViewHandle>>,
    next_handle: AtomicU32,
    attach_calls: AtomicUsize,
    detach_calls: AtomicUsize,
    fail_next_attach: AtomicBool,
}

impl RecordingSurface {
    pub fn attached_count(&self) -> usize {
        self.attached.lock().unwrap().len()
    }

    pub fn attached_texts(&self) -> Vec<String> {
        self.attached
            .lock()
            .unwrap()
            .iter()
            .map(|(_, view)| view.text.clone())
            .collect()
    }

    pub fn attach_calls(&self) -> usize {
        self.attach_calls.load(Ordering::SeqCst)
    }

    pub fn detach_calls(&self) -> usize {
        self.detach_calls.load(Ordering::SeqCst)
    }

    pub fn fail_next_attach(&self) {
        self.fail_next_attach.store(true, Ordering::SeqCst);
    }

    /// Queue a close click on every view currently attached.
    pub fn click_close_on_all(&self) {
        let handles: Vec<_> = self.attached.lock().unwrap().iter().map(|(h, _)| *h).collect();
        self.clicked.lock().unwrap().extend(handles);
    }
}

impl NoticeSurface for RecordingSurface {
    fn attach(&self, view: &NoticeView, _placement: &Placement) -> Result<ViewHandle, AppError> {
        self.attach_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_attach.swap(false, Ordering::SeqCst) {
            return Err(AppError::Surface("attach refused".into()));
        }
        let handle = ViewHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.attached.lock().unwrap().push((handle, view.clone()));
        Ok(handle)
    }

    fn detach(&self, handle: ViewHandle) -> Result<(), AppError> {
        self.detach_calls.fetch_add(1, Ordering::SeqCst);
        self.attached.lock().unwrap().retain(|(h, _)| *h != handle);
        Ok(())
    }

    fn poll_dismissed(&self) -> Vec<ViewHandle> {
        std::mem::take(&mut *self.clicked.lock().unwrap())
    }
}
