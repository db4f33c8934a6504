//! Lock decisions and the text shown while a lock is enforced.

use crate::constants::MS_PER_MINUTE;
use crate::store::LockStore;
use log::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockDecision {
    NotLocked,
    Locked {
        locked_until_ms: i64,
        message: Option<String>,
    },
}

impl LockDecision {
    pub fn is_locked(&self) -> bool {
        matches!(self, LockDecision::Locked { .. })
    }
}

/// Decide whether `application_id` is locked at `now_ms`.
///
/// A lock is active strictly before its expiry. Expired records are left in
/// place and treated as absent. Store failures and corrupt records fail open.
pub fn evaluate(store: &dyn LockStore, application_id: &str, now_ms: i64) -> LockDecision {
    let entry = match store.get(application_id) {
        Ok(Some(entry)) => entry,
        Ok(None) => return LockDecision::NotLocked,
        Err(e) => {
            warn!("Ignoring lock for {application_id}: {e}");
            return LockDecision::NotLocked;
        }
    };

    if now_ms < entry.locked_until_ms {
        LockDecision::Locked {
            locked_until_ms: entry.locked_until_ms,
            message: entry.message,
        }
    } else {
        LockDecision::NotLocked
    }
}

/// Whole minutes left on a lock, never negative.
pub fn remaining_minutes(locked_until_ms: i64, now_ms: i64) -> i64 {
    (locked_until_ms.saturating_sub(now_ms) / MS_PER_MINUTE).max(0)
}

/// Text for the blocking notice: the custom message when one is set,
/// otherwise a default naming the remaining minutes.
pub fn notice_text(locked_until_ms: i64, message: Option<&str>, now_ms: i64) -> String {
    match message {
        Some(custom) if !custom.is_empty() => custom.to_string(),
        _ => {
            let minutes = remaining_minutes(locked_until_ms, now_ms);
            format!("This app is locked for {minutes} more minutes.\n\nStay focused! ✨")
        }
    }
}
