use crate::error::AppError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveWindow {
    /// Stable identifier of the owning application (WM_CLASS on X11).
    pub application_id: String,
    pub window_title: String,
}

pub trait PlatformTracker: Send + Sync {
    fn get_active_window(&self) -> Option<ActiveWindow>;
}

/// Sends the device back to its neutral home state. Best-effort.
pub trait HomeRedirect: Send + Sync {
    fn redirect_to_home(&self);
}

/// What to draw for a notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeView {
    pub title: String,
    pub text: String,
    pub close_label: String,
}

/// Where and how to place a notice on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub width: u16,
    pub height: u16,
    pub centered: bool,
    /// The notice must not take input focus from the foreground window.
    pub focusable: bool,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            width: 480,
            height: 200,
            centered: true,
            focusable: false,
        }
    }
}

/// Opaque handle for a view attached to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewHandle(pub u32);

pub trait NoticeSurface: Send + Sync {
    fn attach(&self, view: &NoticeView, placement: &Placement) -> Result<ViewHandle, AppError>;
    fn detach(&self, handle: ViewHandle) -> Result<(), AppError>;

    /// Views the user closed since the last call.
    fn poll_dismissed(&self) -> Vec<ViewHandle> {
        Vec::new()
    }
}

pub trait PermissionProbe: Send + Sync {
    /// The engine may draw notices over other applications.
    fn can_draw_overlays(&self) -> Result<bool, AppError>;
    /// The engine may observe which application is in the foreground.
    fn has_usage_access(&self) -> Result<bool, AppError>;
    /// The monitoring service is registered to run.
    fn is_monitor_enabled(&self) -> Result<bool, AppError>;
}
