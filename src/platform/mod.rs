pub mod types;

pub use types::{
    ActiveWindow, HomeRedirect, NoticeSurface, NoticeView, PermissionProbe, Placement,
    PlatformTracker, ViewHandle,
};

use crate::error::AppError;
use directories::BaseDirs;
use log::info;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "linux")]
pub use linux::LinuxPlatform as NativePlatform;

#[cfg(not(target_os = "linux"))]
pub use self::HeadlessPlatform as NativePlatform;

/// Name of the desktop entry that registers the monitor at login.
pub const AUTOSTART_ENTRY: &str = "zensta.desktop";

fn autostart_entry_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.config_dir().join("autostart").join(AUTOSTART_ENTRY))
}

/// True when an autostart entry for the monitor exists and is not hidden.
pub fn autostart_entry_enabled() -> Result<bool, AppError> {
    let path = autostart_entry_path()
        .ok_or_else(|| AppError::Platform("could not determine config directory".into()))?;
    if !path.exists() {
        return Ok(false);
    }
    let contents = std::fs::read_to_string(&path)?;
    Ok(desktop_entry_enabled(&contents))
}

fn desktop_entry_enabled(contents: &str) -> bool {
    !contents.lines().map(str::trim).any(|line| {
        line.eq_ignore_ascii_case("Hidden=true")
            || line.eq_ignore_ascii_case("X-GNOME-Autostart-enabled=false")
    })
}

/// Fallback when no windowing system is available: nothing is ever
/// foreground, and redirects and notices are only logged.
#[derive(Debug, Default)]
pub struct HeadlessPlatform {
    next_handle: AtomicU32,
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlatformTracker for HeadlessPlatform {
    fn get_active_window(&self) -> Option<ActiveWindow> {
        None
    }
}

impl HomeRedirect for HeadlessPlatform {
    fn redirect_to_home(&self) {
        info!("Headless: would return to the home screen");
    }
}

impl NoticeSurface for HeadlessPlatform {
    fn attach(&self, view: &NoticeView, _placement: &Placement) -> Result<ViewHandle, AppError> {
        let handle = ViewHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        info!("Headless notice {}: {}", handle.0, view.text);
        Ok(handle)
    }

    fn detach(&self, handle: ViewHandle) -> Result<(), AppError> {
        info!("Headless notice {} removed", handle.0);
        Ok(())
    }
}

impl PermissionProbe for HeadlessPlatform {
    fn can_draw_overlays(&self) -> Result<bool, AppError> {
        Ok(false)
    }

    fn has_usage_access(&self) -> Result<bool, AppError> {
        Ok(false)
    }

    fn is_monitor_enabled(&self) -> Result<bool, AppError> {
        autostart_entry_enabled()
    }
}
