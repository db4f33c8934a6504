use crate::clock::Clock;
use crate::evaluator::{evaluate, LockDecision};
use crate::events::ForegroundEvent;
use crate::notice::{Notice, NoticeManager};
use crate::platform::{HomeRedirect, NoticeSurface};
use crate::store::LockStore;
use log::{debug, info};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

/// How often the loop wakes up to collect close clicks when no events arrive.
const USER_DISMISS_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Blocking { application_id: String },
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not a foreground change, or no application named.
    Ignored,
    NotLocked,
    /// Redirected home; `notice` is `None` if it could not be displayed.
    Enforced { notice: Option<Notice> },
}

/// Reacts to foreground changes by enforcing active locks.
pub struct LockMonitor {
    store: Arc<dyn LockStore>,
    redirect: Arc<dyn HomeRedirect>,
    notices: Arc<NoticeManager>,
    clock: Arc<dyn Clock>,
}

impl LockMonitor {
    pub fn new(
        store: Arc<dyn LockStore>,
        redirect: Arc<dyn HomeRedirect>,
        notices: Arc<NoticeManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            redirect,
            notices,
            clock,
        }
    }

    /// Service connected: take the display surface.
    pub fn on_start(&self, surface: Arc<dyn NoticeSurface>) {
        info!("Lock monitor started");
        self.notices.attach_surface(surface);
    }

    /// Service interrupted: clear the screen but keep the surface.
    pub fn on_interrupt(&self) {
        debug!("Lock monitor interrupted");
        self.notices.dismiss();
    }

    /// Service stopping: clear the screen and give the surface back.
    pub fn on_stop(&self) {
        info!("Lock monitor stopped");
        self.notices.release_surface();
    }

    pub fn state(&self) -> MonitorState {
        match self.notices.current() {
            Some(notice) => MonitorState::Blocking {
                application_id: notice.target_application_id,
            },
            None => MonitorState::Idle,
        }
    }

    pub fn notices(&self) -> &Arc<NoticeManager> {
        &self.notices
    }

    /// Evaluate one event and intervene if its application is locked.
    ///
    /// Unlocked applications leave an existing notice alone; it goes away on
    /// its own timer or when the user closes it.
    pub fn handle_event(&self, event: &ForegroundEvent) -> Outcome {
        let Some(application_id) = event.foreground_application() else {
            return Outcome::Ignored;
        };

        let now = self.clock.now_ms();
        match evaluate(self.store.as_ref(), application_id, now) {
            LockDecision::NotLocked => Outcome::NotLocked,
            LockDecision::Locked {
                locked_until_ms,
                message,
            } => {
                info!("{application_id} is locked until {locked_until_ms}, enforcing");
                self.redirect.redirect_to_home();
                let notice = self
                    .notices
                    .show(application_id, locked_until_ms, message.as_deref());
                Outcome::Enforced { notice }
            }
        }
    }

    /// Consume events in arrival order until the sender side goes away, then
    /// tear down. Close clicks on the notice are collected between events.
    pub fn run(&self, events: &Receiver<ForegroundEvent>) {
        loop {
            match events.recv_timeout(USER_DISMISS_POLL) {
                Ok(event) => {
                    self.handle_event(&event);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.notices.poll_user_dismissals();
        }
        self.on_stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Scheduler;
    use crate::constants::NOTICE_DISMISS_MS;
    use crate::events::EventKind;
    use crate::test_utils::{
        ManualClock, ManualScheduler, MemoryLockStore, RecordingRedirect, RecordingSurface,
    };
    use std::sync::mpsc;
    use std::thread;

    const NOW: i64 = 1_700_000_000_000;

    struct Harness {
        monitor: LockMonitor,
        store: Arc<MemoryLockStore>,
        redirect: Arc<RecordingRedirect>,
        surface: Arc<RecordingSurface>,
        scheduler: Arc<ManualScheduler>,
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::new(NOW));
        let scheduler = Arc::new(ManualScheduler::new(Arc::clone(&clock)));
        let store = Arc::new(MemoryLockStore::default());
        let redirect = Arc::new(RecordingRedirect::default());
        let surface = Arc::new(RecordingSurface::default());
        let notices = NoticeManager::with_default_duration(
            Arc::clone(&scheduler) as Arc<dyn Scheduler>,
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        let monitor = LockMonitor::new(
            Arc::clone(&store) as Arc<dyn LockStore>,
            Arc::clone(&redirect) as Arc<dyn HomeRedirect>,
            notices,
            clock,
        );
        monitor.on_start(Arc::clone(&surface) as Arc<dyn NoticeSurface>);
        Harness {
            monitor,
            store,
            redirect,
            surface,
            scheduler,
        }
    }

    #[test]
    fn test_locked_app_is_enforced() {
        let h = harness();
        h.store.insert("com.example.game", NOW + 120_000, None);

        let outcome = h
            .monitor
            .handle_event(&ForegroundEvent::foreground_changed("com.example.game", NOW));

        let notice = match outcome {
            Outcome::Enforced { notice: Some(notice) } => notice,
            other => panic!("expected enforcement, got {other:?}"),
        };
        assert!(notice.remaining_text.contains("2 more minutes"));
        assert_eq!(h.redirect.count(), 1);
        assert_eq!(
            h.monitor.state(),
            MonitorState::Blocking {
                application_id: "com.example.game".into()
            }
        );

        h.scheduler.advance(NOTICE_DISMISS_MS);
        assert_eq!(h.monitor.state(), MonitorState::Idle);
        assert_eq!(h.surface.attached_count(), 0);
    }

    #[test]
    fn test_unlocked_app_is_left_alone() {
        let h = harness();

        let outcome = h
            .monitor
            .handle_event(&ForegroundEvent::foreground_changed("com.example.game", NOW));

        assert_eq!(outcome, Outcome::NotLocked);
        assert_eq!(h.redirect.count(), 0);
        assert_eq!(h.surface.attach_calls(), 0);
        assert_eq!(h.monitor.state(), MonitorState::Idle);
    }

    #[test]
    fn test_expired_lock_is_not_enforced() {
        let h = harness();
        h.store.insert("com.example.game", NOW, Some("stale"));

        let outcome = h
            .monitor
            .handle_event(&ForegroundEvent::foreground_changed("com.example.game", NOW));

        assert_eq!(outcome, Outcome::NotLocked);
        assert_eq!(h.redirect.count(), 0);
    }

    #[test]
    fn test_unlocked_event_keeps_existing_notice() {
        let h = harness();
        h.store.insert("com.example.game", NOW + 120_000, None);

        h.monitor
            .handle_event(&ForegroundEvent::foreground_changed("com.example.game", NOW));
        h.monitor
            .handle_event(&ForegroundEvent::foreground_changed("org.launcher", NOW));

        assert_eq!(
            h.monitor.state(),
            MonitorState::Blocking {
                application_id: "com.example.game".into()
            }
        );
    }

    #[test]
    fn test_non_foreground_events_are_ignored() {
        let h = harness();
        h.store.insert("com.example.game", NOW + 120_000, None);

        let event = ForegroundEvent {
            kind: EventKind::WindowContentChanged,
            application_id: Some("com.example.game".into()),
            timestamp_ms: NOW,
        };
        assert_eq!(h.monitor.handle_event(&event), Outcome::Ignored);

        let event = ForegroundEvent {
            kind: EventKind::WindowStateChanged,
            application_id: None,
            timestamp_ms: NOW,
        };
        assert_eq!(h.monitor.handle_event(&event), Outcome::Ignored);
        assert_eq!(h.redirect.count(), 0);
    }

    #[test]
    fn test_second_locked_app_replaces_notice() {
        let h = harness();
        h.store.insert("com.example.a", NOW + 600_000, None);
        h.store.insert("com.example.b", NOW + 600_000, Some("B later"));

        h.monitor
            .handle_event(&ForegroundEvent::foreground_changed("com.example.a", NOW));
        h.scheduler.advance(2000);
        h.monitor
            .handle_event(&ForegroundEvent::foreground_changed("com.example.b", NOW + 2000));
        h.scheduler.advance(1500);

        assert_eq!(h.redirect.count(), 2);
        assert_eq!(h.surface.attached_texts(), vec!["B later".to_string()]);
        assert_eq!(
            h.monitor.state(),
            MonitorState::Blocking {
                application_id: "com.example.b".into()
            }
        );
    }

    #[test]
    fn test_interrupt_dismisses_but_keeps_surface() {
        let h = harness();
        h.store.insert("com.example.game", NOW + 120_000, None);
        h.monitor
            .handle_event(&ForegroundEvent::foreground_changed("com.example.game", NOW));

        h.monitor.on_interrupt();

        assert_eq!(h.monitor.state(), MonitorState::Idle);
        assert!(h.monitor.notices().has_surface());
        assert_eq!(h.surface.attached_count(), 0);
    }

    #[test]
    fn test_stop_releases_surface() {
        let h = harness();
        h.store.insert("com.example.game", NOW + 120_000, None);
        h.monitor
            .handle_event(&ForegroundEvent::foreground_changed("com.example.game", NOW));

        h.monitor.on_stop();

        assert!(!h.monitor.notices().has_surface());
        assert_eq!(h.surface.attached_count(), 0);

        // Without a surface the redirect still happens, the notice does not
        let outcome = h
            .monitor
            .handle_event(&ForegroundEvent::foreground_changed("com.example.game", NOW));
        assert_eq!(outcome, Outcome::Enforced { notice: None });
        assert_eq!(h.redirect.count(), 2);
    }

    #[test]
    fn test_run_processes_events_then_tears_down() {
        let h = harness();
        h.store.insert("com.example.game", NOW + 120_000, None);
        let (tx, rx) = mpsc::channel();

        let sender = thread::spawn(move || {
            tx.send(ForegroundEvent::foreground_changed("org.editor", NOW))
                .unwrap();
            tx.send(ForegroundEvent::foreground_changed("com.example.game", NOW))
                .unwrap();
        });

        h.monitor.run(&rx);
        sender.join().unwrap();

        assert_eq!(h.redirect.count(), 1);
        assert_eq!(h.surface.attach_calls(), 1);
        assert!(!h.monitor.notices().has_surface());
        assert_eq!(h.surface.attached_count(), 0);
    }

    #[test]
    fn test_user_close_clears_blocking_state() {
        let h = harness();
        h.store.insert("com.example.game", NOW + 120_000, None);
        h.monitor
            .handle_event(&ForegroundEvent::foreground_changed("com.example.game", NOW));
        h.surface.click_close_on_all();

        h.monitor.notices().poll_user_dismissals();

        assert_eq!(h.monitor.state(), MonitorState::Idle);
        assert_eq!(h.surface.detach_calls(), 1);
    }
}
