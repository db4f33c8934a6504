//! Ownership of the single blocking notice.
//!
//! At most one notice is attached to the surface at any time. Every surface
//! call happens under `state`, so show/dismiss are serialized no matter which
//! thread (event loop, timer, user action) triggers them. Auto-dismiss timers
//! carry the id of the notice they were armed for and do nothing once that
//! notice is gone.

use crate::clock::{Clock, Scheduler};
use crate::constants::NOTICE_DISMISS_MS;
use crate::evaluator::notice_text;
use crate::platform::{NoticeSurface, NoticeView, Placement, ViewHandle};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

/// The notice currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub target_application_id: String,
    pub displayed_at_ms: i64,
    pub remaining_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    /// The auto-dismiss timer fired.
    Timeout,
    /// The user closed the notice.
    User,
    /// A newer notice took its place.
    Replaced,
    /// Explicit `dismiss()` or service teardown.
    Requested,
}

struct ActiveNotice {
    notice: Notice,
    handle: ViewHandle,
}

#[derive(Default)]
struct NoticeState {
    surface: Option<Arc<dyn NoticeSurface>>,
    active: Option<ActiveNotice>,
    next_id: u64,
}

pub struct NoticeManager {
    state: Mutex<NoticeState>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    dismiss_after: Duration,
    placement: Placement,
    this: Weak<NoticeManager>,
}

impl NoticeManager {
    pub fn new(scheduler: Arc<dyn Scheduler>, clock: Arc<dyn Clock>, dismiss_after: Duration) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            state: Mutex::new(NoticeState::default()),
            scheduler,
            clock,
            dismiss_after,
            placement: Placement::default(),
            this: Weak::clone(this),
        })
    }

    pub fn with_default_duration(scheduler: Arc<dyn Scheduler>, clock: Arc<dyn Clock>) -> Arc<Self> {
        Self::new(scheduler, clock, Duration::from_millis(NOTICE_DISMISS_MS))
    }

    fn lock_state(&self) -> MutexGuard<'_, NoticeState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Notice state mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Take ownership of the display surface. A previously held surface is
    /// released first, taking its notice with it.
    pub fn attach_surface(&self, surface: Arc<dyn NoticeSurface>) {
        let mut state = self.lock_state();
        Self::remove_active(&mut state, DismissReason::Requested);
        state.surface = Some(surface);
    }

    /// Dismiss any notice and give up the surface. Returns false if no
    /// surface was held.
    pub fn release_surface(&self) -> bool {
        let mut state = self.lock_state();
        Self::remove_active(&mut state, DismissReason::Requested);
        state.surface.take().is_some()
    }

    pub fn has_surface(&self) -> bool {
        self.lock_state().surface.is_some()
    }

    /// Replace whatever is on screen with a notice for `application_id` and
    /// arm its auto-dismiss timer. Returns the notice if it was displayed.
    pub fn show(&self, application_id: &str, locked_until_ms: i64, message: Option<&str>) -> Option<Notice> {
        let notice = {
            let mut state = self.lock_state();
            Self::remove_active(&mut state, DismissReason::Replaced);

            let Some(surface) = state.surface.as_ref().map(Arc::clone) else {
                warn!("No notice surface attached, cannot show notice for {application_id}");
                return None;
            };

            let now = self.clock.now_ms();
            state.next_id += 1;
            let notice = Notice {
                id: state.next_id,
                target_application_id: application_id.to_string(),
                displayed_at_ms: now,
                remaining_text: notice_text(locked_until_ms, message, now),
            };

            let view = NoticeView {
                title: "App locked".into(),
                text: notice.remaining_text.clone(),
                close_label: "Click to close".into(),
            };
            let handle = match surface.attach(&view, &self.placement) {
                Ok(handle) => handle,
                Err(e) => {
                    warn!("Failed to show notice for {application_id}: {e}");
                    return None;
                }
            };

            info!("Showing notice {} for {application_id}", notice.id);
            state.active = Some(ActiveNotice {
                notice: notice.clone(),
                handle,
            });
            notice
        };

        self.arm_timer(notice.id);
        Some(notice)
    }

    fn arm_timer(&self, notice_id: u64) {
        let this = Weak::clone(&self.this);
        self.scheduler.schedule(
            self.dismiss_after,
            Box::new(move || {
                if let Some(manager) = this.upgrade() {
                    manager.expire(notice_id);
                }
            }),
        );
    }

    /// Auto-dismiss path. Only acts if `notice_id` is still the one on screen.
    pub fn expire(&self, notice_id: u64) -> bool {
        let mut state = self.lock_state();
        let is_current = state.active.as_ref().is_some_and(|a| a.notice.id == notice_id);
        if !is_current {
            debug!("Ignoring stale dismiss timer for notice {notice_id}");
            return false;
        }
        Self::remove_active(&mut state, DismissReason::Timeout)
    }

    /// Remove the notice if one is shown. Safe to call repeatedly.
    pub fn dismiss(&self) -> bool {
        Self::remove_active(&mut self.lock_state(), DismissReason::Requested)
    }

    /// The user closed the view behind `handle`.
    pub fn user_dismissed(&self, handle: ViewHandle) -> bool {
        let mut state = self.lock_state();
        let is_current = state.active.as_ref().is_some_and(|a| a.handle == handle);
        is_current && Self::remove_active(&mut state, DismissReason::User)
    }

    /// Collect close actions from the surface and apply them.
    pub fn poll_user_dismissals(&self) {
        let surface = self.lock_state().surface.as_ref().map(Arc::clone);
        let Some(surface) = surface else {
            return;
        };
        for handle in surface.poll_dismissed() {
            self.user_dismissed(handle);
        }
    }

    pub fn current(&self) -> Option<Notice> {
        self.lock_state().active.as_ref().map(|a| a.notice.clone())
    }

    pub fn is_active(&self) -> bool {
        self.lock_state().active.is_some()
    }

    fn remove_active(state: &mut NoticeState, reason: DismissReason) -> bool {
        let Some(active) = state.active.take() else {
            return false;
        };

        debug!("Dismissing notice {} ({reason:?})", active.notice.id);
        if let Some(surface) = state.surface.as_ref() {
            if let Err(e) = surface.detach(active.handle) {
                warn!("Failed to remove notice {}: {e}", active.notice.id);
            }
        }
        true
    }
}

impl Drop for NoticeManager {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        Self::remove_active(state, DismissReason::Requested);
    }
}
