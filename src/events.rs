use serde::{Deserialize, Serialize};

/// What kind of change the event source observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A different window/application took the foreground.
    WindowStateChanged,
    /// Content changed inside the current window.
    WindowContentChanged,
    Other,
}

/// Notification that an application may have become foreground.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForegroundEvent {
    pub kind: EventKind,
    pub application_id: Option<String>,
    pub timestamp_ms: i64,
}

impl ForegroundEvent {
    pub fn foreground_changed(application_id: &str, timestamp_ms: i64) -> Self {
        Self {
            kind: EventKind::WindowStateChanged,
            application_id: Some(application_id.to_string()),
            timestamp_ms,
        }
    }

    /// The application to evaluate, if this event should be evaluated at all.
    pub fn foreground_application(&self) -> Option<&str> {
        match self.kind {
            EventKind::WindowStateChanged => self
                .application_id
                .as_deref()
                .filter(|id| !id.trim().is_empty()),
            EventKind::WindowContentChanged | EventKind::Other => None,
        }
    }
}
