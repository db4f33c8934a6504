use crate::clock::Clock;
use crate::constants::FOREGROUND_POLL_MS;
use crate::events::ForegroundEvent;
use crate::platform::PlatformTracker;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    pub poll_interval_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: FOREGROUND_POLL_MS,
        }
    }
}

/// Turns a pollable platform into a stream of foreground-change events.
pub struct TrackerService {
    config: TrackerConfig,
    running: Arc<AtomicBool>,
    platform: Arc<dyn PlatformTracker>,
    clock: Arc<dyn Clock>,
}

/// Remembers the last foreground application so only changes are reported.
#[derive(Debug, Default)]
pub struct ForegroundWatch {
    last: Option<String>,
}

impl ForegroundWatch {
    /// Sample the platform once; `Some` when a different application came forward.
    pub fn poll(&mut self, platform: &dyn PlatformTracker, clock: &dyn Clock) -> Option<ForegroundEvent> {
        let Some(window) = platform.get_active_window() else {
            // Nothing focused (e.g. the desktop): returning to the same app counts as a change
            self.last = None;
            return None;
        };

        if self.last.as_deref() == Some(window.application_id.as_str()) {
            return None;
        }

        debug!(
            "Foreground changed to {} ({})",
            window.application_id, window.window_title
        );
        let event = ForegroundEvent::foreground_changed(&window.application_id, clock.now_ms());
        self.last = Some(window.application_id);
        Some(event)
    }
}

impl TrackerService {
    pub fn new(platform: Arc<dyn PlatformTracker>, clock: Arc<dyn Clock>, config: TrackerConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            platform,
            clock,
        }
    }

    /// Start polling on a background thread. The thread exits when stopped
    /// or when the receiving side of `events` is dropped; either way the
    /// sender is dropped, which ends the consumer's stream.
    pub fn start(&self, events: Sender<ForegroundEvent>) -> thread::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let platform = Arc::clone(&self.platform);
        let clock = Arc::clone(&self.clock);
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        thread::spawn(move || {
            let mut watch = ForegroundWatch::default();
            while running.load(Ordering::SeqCst) {
                if let Some(event) = watch.poll(platform.as_ref(), clock.as_ref()) {
                    if events.send(event).is_err() {
                        warn!("Foreground event receiver closed, stopping tracker");
                        running.store(false, Ordering::SeqCst);
                        break;
                    }
                }
                thread::sleep(interval);
            }
        })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ActiveWindow;
    use crate::test_utils::ManualClock;
    use std::collections::VecDeque;
    use std::sync::mpsc;
    use std::sync::Mutex;

    /// Replays a fixed sequence of foreground windows.
    struct ScriptedTracker(Mutex<VecDeque<Option<&'static str>>>);

    impl ScriptedTracker {
        fn new(script: &[Option<&'static str>]) -> Self {
            Self(Mutex::new(script.iter().copied().collect()))
        }
    }

    impl PlatformTracker for ScriptedTracker {
        fn get_active_window(&self) -> Option<ActiveWindow> {
            let next = self.0.lock().unwrap().pop_front().flatten()?;
            Some(ActiveWindow {
                application_id: next.to_string(),
                window_title: format!("{next} window"),
            })
        }
    }

    #[test]
    fn test_watch_reports_only_changes() {
        let platform = ScriptedTracker::new(&[
            Some("editor"),
            Some("editor"),
            Some("game"),
            None,
            Some("game"),
        ]);
        let clock = ManualClock::new(1000);
        let mut watch = ForegroundWatch::default();

        let seen: Vec<_> = (0..5)
            .filter_map(|_| watch.poll(&platform, &clock))
            .map(|e| e.application_id.unwrap())
            .collect();

        assert_eq!(seen, vec!["editor", "game", "game"]);
    }

    #[test]
    fn test_watch_stamps_events_with_clock() {
        let platform = ScriptedTracker::new(&[Some("game")]);
        let clock = ManualClock::new(42);
        let event = ForegroundWatch::default().poll(&platform, &clock).unwrap();
        assert_eq!(event.timestamp_ms, 42);
    }

    #[test]
    fn test_tracker_starts_and_stops() {
        let platform = Arc::new(ScriptedTracker::new(&[Some("game")]));
        let tracker = TrackerService::new(
            platform,
            Arc::new(ManualClock::new(0)),
            TrackerConfig { poll_interval_ms: 5 },
        );
        let (tx, rx) = mpsc::channel();

        assert!(!tracker.is_running());

        let handle = tracker.start(tx);
        assert!(tracker.is_running());

        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event.application_id.as_deref(), Some("game"));

        tracker.stop();
        handle.join().unwrap();

        assert!(!tracker.is_running());
        // The sender went away with the thread
        assert!(rx.recv().is_err());
    }
}
