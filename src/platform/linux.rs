use super::{
    autostart_entry_enabled, ActiveWindow, HomeRedirect, NoticeSurface, NoticeView, PermissionProbe,
    Placement, PlatformTracker, ViewHandle,
};
use crate::error::AppError;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    AtomEnum, ClientMessageEvent, ConnectionExt, CreateGCAux, CreateWindowAux, EventMask, Font,
    Gcontext, Screen, Window, WindowClass,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::COPY_DEPTH_FROM_PARENT;

const LINE_HEIGHT: i16 = 18;
const TEXT_MARGIN: i16 = 20;
/// ImageText8 carries at most 255 bytes per request.
const MAX_LINE_BYTES: usize = 255;

struct Display {
    conn: RustConnection,
    root: Window,
    width: u16,
    height: u16,
    white_pixel: u32,
    black_pixel: u32,
}

/// A notice window and the resources drawn into it.
struct NoticeWindow {
    gc: Gcontext,
    font: Font,
    lines: Vec<String>,
}

/// X11 backend: foreground tracking, show-desktop redirect and notice windows
/// all share one connection.
pub struct LinuxPlatform {
    display: Option<Display>,
    notices: Mutex<HashMap<Window, NoticeWindow>>,
}

impl Default for LinuxPlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn surface_err(e: impl std::fmt::Display) -> AppError {
    AppError::Surface(e.to_string())
}

fn platform_err(e: impl std::fmt::Display) -> AppError {
    AppError::Platform(e.to_string())
}

impl LinuxPlatform {
    pub fn new() -> Self {
        let display = match x11rb::connect(None) {
            Ok((conn, screen_num)) => {
                let screen: Option<Screen> = conn.setup().roots.get(screen_num).cloned();
                match screen {
                    Some(screen) => Some(Display {
                        conn,
                        root: screen.root,
                        width: screen.width_in_pixels,
                        height: screen.height_in_pixels,
                        white_pixel: screen.white_pixel,
                        black_pixel: screen.black_pixel,
                    }),
                    None => {
                        warn!("Invalid screen number {screen_num}. Window tracking disabled.");
                        None
                    }
                }
            }
            Err(e) => {
                // Wayland or headless: keep running, just without a display
                warn!("Failed to connect to X server: {e}. Window tracking disabled.");
                None
            }
        };

        Self {
            display,
            notices: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.display.is_some()
    }

    fn lock_notices(&self) -> MutexGuard<'_, HashMap<Window, NoticeWindow>> {
        self.notices.lock().unwrap_or_else(|poisoned| {
            warn!("Notice window mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn get_atom(&self, name: &str) -> Option<u32> {
        self.display
            .as_ref()?
            .conn
            .intern_atom(false, name.as_bytes())
            .ok()?
            .reply()
            .ok()
            .map(|r| r.atom)
    }

    fn get_window_property(&self, window: Window, atom: u32) -> Option<String> {
        let reply = self
            .display
            .as_ref()?
            .conn
            .get_property(false, window, atom, AtomEnum::ANY, 0, 1024)
            .ok()?
            .reply()
            .ok()?;

        if reply.value.is_empty() {
            return None;
        }

        String::from_utf8(reply.value).ok()
    }

    fn get_active_window_id(&self) -> Option<Window> {
        let display = self.display.as_ref()?;
        let atom = self.get_atom("_NET_ACTIVE_WINDOW")?;
        let reply = display
            .conn
            .get_property(false, display.root, atom, AtomEnum::WINDOW, 0, 1)
            .ok()?
            .reply()
            .ok()?;

        let id = reply.value32()?.next().filter(|id| *id != x11rb::NONE);
        id
    }

    fn draw(display: &Display, window: Window, notice: &NoticeWindow) -> Result<(), AppError> {
        let mut y = TEXT_MARGIN + LINE_HEIGHT;
        for line in &notice.lines {
            if !line.is_empty() {
                display
                    .conn
                    .image_text8(window, notice.gc, TEXT_MARGIN, y, line.as_bytes())
                    .map_err(surface_err)?;
            }
            y = y.saturating_add(LINE_HEIGHT);
        }
        display.conn.flush().map_err(surface_err)?;
        Ok(())
    }
}

/// Core fonts are Latin-1; keep printable ASCII and cap the request size.
fn render_lines(view: &NoticeView) -> Vec<String> {
    let mut lines = vec![view.title.clone(), String::new()];
    lines.extend(view.text.lines().map(str::to_string));
    lines.push(String::new());
    lines.push(view.close_label.clone());

    lines
        .into_iter()
        .map(|line| {
            line.chars()
                .filter(|c| c.is_ascii() && !c.is_ascii_control())
                .take(MAX_LINE_BYTES)
                .collect()
        })
        .collect()
}

/// WM_CLASS is "instance\0class\0". The instance can be set per launch, so
/// the class identifies the application; the instance is used only when no
/// class is set.
fn application_id_from_wm_class(wm_class: &str) -> Option<String> {
    let mut parts = wm_class.split('\0');
    let instance = parts.next().unwrap_or_default();
    let class = parts.next().unwrap_or_default();
    [class, instance]
        .into_iter()
        .find(|part| !part.is_empty())
        .map(str::to_string)
}

fn centered_origin(screen: u16, size: u16) -> i16 {
    i16::try_from(screen.saturating_sub(size) / 2).unwrap_or(0)
}

impl PlatformTracker for LinuxPlatform {
    fn get_active_window(&self) -> Option<ActiveWindow> {
        let window_id = self.get_active_window_id()?;

        // Never report our own notice windows as the foreground application
        if self.lock_notices().contains_key(&window_id) {
            return None;
        }

        let name_atom = self
            .get_atom("_NET_WM_NAME")
            .or_else(|| Some(AtomEnum::WM_NAME.into()))?;

        let window_title = self
            .get_window_property(window_id, name_atom)
            .unwrap_or_else(|| "Unknown".to_string());

        let wm_class = self.get_window_property(window_id, AtomEnum::WM_CLASS.into())?;
        let application_id = application_id_from_wm_class(&wm_class)?;

        Some(ActiveWindow {
            application_id,
            window_title,
        })
    }
}

impl HomeRedirect for LinuxPlatform {
    fn redirect_to_home(&self) {
        let Some(display) = self.display.as_ref() else {
            debug!("No X display, skipping home redirect");
            return;
        };
        let Some(atom) = self.get_atom("_NET_SHOWING_DESKTOP") else {
            warn!("Window manager does not expose _NET_SHOWING_DESKTOP");
            return;
        };

        let event = ClientMessageEvent::new(32, display.root, atom, [1u32, 0, 0, 0, 0]);
        let sent = display
            .conn
            .send_event(
                false,
                display.root,
                EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
                event,
            )
            .map(|_| ())
            .and_then(|()| display.conn.flush());

        if let Err(e) = sent {
            warn!("Home redirect failed: {e}");
        }
    }
}

impl NoticeSurface for LinuxPlatform {
    fn attach(&self, view: &NoticeView, placement: &Placement) -> Result<ViewHandle, AppError> {
        let display = self
            .display
            .as_ref()
            .ok_or_else(|| AppError::Surface("no X display".into()))?;
        let conn = &display.conn;

        let (x, y) = if placement.centered {
            (
                centered_origin(display.width, placement.width),
                centered_origin(display.height, placement.height),
            )
        } else {
            (0, 0)
        };

        let window = conn.generate_id().map_err(surface_err)?;
        let font = conn.generate_id().map_err(surface_err)?;
        let gc = conn.generate_id().map_err(surface_err)?;

        let window_aux = CreateWindowAux::new()
            .background_pixel(display.white_pixel)
            .border_pixel(display.black_pixel)
            .override_redirect(u32::from(!placement.focusable))
            .event_mask(EventMask::EXPOSURE | EventMask::BUTTON_PRESS);
        conn.create_window(
            COPY_DEPTH_FROM_PARENT,
            window,
            display.root,
            x,
            y,
            placement.width,
            placement.height,
            2,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &window_aux,
        )
        .map_err(surface_err)?;

        conn.open_font(font, b"fixed").map_err(surface_err)?;
        let gc_aux = CreateGCAux::new()
            .foreground(display.black_pixel)
            .background(display.white_pixel)
            .font(font);
        conn.create_gc(gc, window, &gc_aux).map_err(surface_err)?;
        conn.map_window(window).map_err(surface_err)?;

        let notice = NoticeWindow {
            gc,
            font,
            lines: render_lines(view),
        };
        Self::draw(display, window, &notice)?;
        self.lock_notices().insert(window, notice);

        Ok(ViewHandle(window))
    }

    fn detach(&self, handle: ViewHandle) -> Result<(), AppError> {
        let display = self
            .display
            .as_ref()
            .ok_or_else(|| AppError::Surface("no X display".into()))?;
        let Some(notice) = self.lock_notices().remove(&handle.0) else {
            return Ok(());
        };

        let conn = &display.conn;
        conn.destroy_window(handle.0).map_err(surface_err)?;
        conn.free_gc(notice.gc).map_err(surface_err)?;
        conn.close_font(notice.font).map_err(surface_err)?;
        conn.flush().map_err(surface_err)?;
        Ok(())
    }

    fn poll_dismissed(&self) -> Vec<ViewHandle> {
        let Some(display) = self.display.as_ref() else {
            return Vec::new();
        };

        let mut dismissed = Vec::new();
        loop {
            let event = match display.conn.poll_for_event() {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(e) => {
                    warn!("Lost X connection while polling notice events: {e}");
                    break;
                }
            };

            if let Event::Expose(expose) = &event {
                if expose.count == 0 {
                    let notices = self.lock_notices();
                    if let Some(notice) = notices.get(&expose.window) {
                        if let Err(e) = Self::draw(display, expose.window, notice) {
                            warn!("Failed to redraw notice: {e}");
                        }
                    }
                }
            } else if let Event::ButtonPress(press) = &event {
                if self.lock_notices().contains_key(&press.event) {
                    dismissed.push(ViewHandle(press.event));
                }
            }
        }
        dismissed
    }
}

impl PermissionProbe for LinuxPlatform {
    fn can_draw_overlays(&self) -> Result<bool, AppError> {
        Ok(self.is_connected())
    }

    fn has_usage_access(&self) -> Result<bool, AppError> {
        let Some(display) = self.display.as_ref() else {
            return Ok(false);
        };
        let supported = self
            .get_atom("_NET_SUPPORTED")
            .ok_or_else(|| AppError::Platform("cannot intern _NET_SUPPORTED".into()))?;
        let active = self
            .get_atom("_NET_ACTIVE_WINDOW")
            .ok_or_else(|| AppError::Platform("cannot intern _NET_ACTIVE_WINDOW".into()))?;

        let reply = display
            .conn
            .get_property(false, display.root, supported, AtomEnum::ATOM, 0, 4096)
            .map_err(platform_err)?
            .reply()
            .map_err(platform_err)?;

        Ok(reply
            .value32()
            .is_some_and(|mut atoms| atoms.any(|atom| atom == active)))
    }

    fn is_monitor_enabled(&self) -> Result<bool, AppError> {
        autostart_entry_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lines_strips_non_ascii() {
        let view = NoticeView {
            title: "Locked".into(),
            text: "This app is locked for 2 more minutes.\n\nStay focused! ✨".into(),
            close_label: "Click to close".into(),
        };
        let lines = render_lines(&view);
        assert_eq!(lines.first().map(String::as_str), Some("Locked"));
        assert!(lines.iter().any(|l| l == "Stay focused! "));
        assert_eq!(lines.last().map(String::as_str), Some("Click to close"));
    }

    #[test]
    fn test_application_id_uses_class_not_instance() {
        assert_eq!(
            application_id_from_wm_class("navigator\0firefox\0").as_deref(),
            Some("firefox")
        );
        // A renamed instance still maps to the same application
        assert_eq!(
            application_id_from_wm_class("x game\0Game\0").as_deref(),
            Some("Game")
        );
    }

    #[test]
    fn test_application_id_falls_back_to_instance() {
        assert_eq!(
            application_id_from_wm_class("xterm\0\0").as_deref(),
            Some("xterm")
        );
        assert_eq!(application_id_from_wm_class("xterm").as_deref(), Some("xterm"));
        assert_eq!(application_id_from_wm_class("\0\0"), None);
    }

    #[test]
    fn test_centered_origin() {
        assert_eq!(centered_origin(1920, 480), 720);
        assert_eq!(centered_origin(100, 480), 0);
    }

    #[test]
    #[ignore] // Requires X11 display
    fn test_get_active_window() {
        let platform = LinuxPlatform::new();
        if let Some(window) = platform.get_active_window() {
            assert!(!window.application_id.is_empty());
        }
    }

    #[test]
    #[ignore] // Requires X11 display
    fn test_attach_and_detach_notice() {
        let platform = LinuxPlatform::new();
        let view = NoticeView {
            title: "Locked".into(),
            text: "test".into(),
            close_label: "Click to close".into(),
        };
        let handle = platform.attach(&view, &Placement::default()).unwrap();
        platform.detach(handle).unwrap();
        platform.detach(handle).unwrap();
    }
}
