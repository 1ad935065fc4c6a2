//! The window registry and every operation that mutates it.
//!
//! `WindowManager` is the single owned aggregate for desktop state: windows in
//! insertion order, the active id, the z-order allocator, the current virtual
//! desktop, in-flight drag/resize sessions, the switcher, transient overlays,
//! and toasts. Operations on ids that are not in the registry are no-ops and
//! report that nothing changed.
//!
//! A [`DesktopEvent`] is broadcast after every committed mutation.

use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use shared_types::{
    AppDefinition, DesktopEvent, DesktopState, OverlayKind, Overlays, Rect, SystemStats, Toast,
    ToastLevel, UserConfig, WindowState,
};
use tokio::sync::broadcast;

use super::geometry::{clamp_size, ResizeEdges, ScreenLayout};
use super::interaction::{
    DragCommit, DragFrame, DragSession, InputSource, Point, ResizeFrame, ResizeSession,
};
use super::switcher::WindowSwitcher;
use super::tap::{TapDetector, TapOutcome};
use super::toasts::ToastCenter;
use super::{DesktopError, Key, KeyOutcome};

/// First z-index handed out; the bar and desktop icons sit below it.
pub const INITIAL_Z_INDEX: u32 = 10;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// What a taskbar click did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskbarAction {
    Restored,
    Minimized,
    Focused,
}

pub struct WindowManager {
    windows: Vec<WindowState>,
    apps: Vec<AppDefinition>,
    active_window: Option<String>,
    next_z_index: u32,
    current_desktop: u32,
    last_id_millis: i64,
    layout: ScreenLayout,
    drag: Option<DragSession>,
    resize: Option<ResizeSession>,
    switcher: WindowSwitcher,
    super_tap: TapDetector,
    overlays: Overlays,
    toasts: ToastCenter,
    config: UserConfig,
    stats: SystemStats,
    events: broadcast::Sender<DesktopEvent>,
}

impl WindowManager {
    pub fn new(layout: ScreenLayout, apps: Vec<AppDefinition>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let config = UserConfig {
            bar_position: layout.bar_position,
            ..UserConfig::default()
        };
        Self {
            windows: Vec::new(),
            apps,
            active_window: None,
            next_z_index: INITIAL_Z_INDEX,
            current_desktop: 0,
            last_id_millis: 0,
            layout,
            drag: None,
            resize: None,
            switcher: WindowSwitcher::default(),
            super_tap: TapDetector::default(),
            overlays: Overlays::default(),
            toasts: ToastCenter::default(),
            config,
            stats: SystemStats::default(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DesktopEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: DesktopEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // ------------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------------

    pub fn windows(&self) -> &[WindowState] {
        &self.windows
    }

    pub fn window(&self, window_id: &str) -> Option<&WindowState> {
        self.windows.iter().find(|w| w.id == window_id)
    }

    fn window_mut(&mut self, window_id: &str) -> Option<&mut WindowState> {
        self.windows.iter_mut().find(|w| w.id == window_id)
    }

    /// Windows with a frame; tracking records only support close.
    fn framed(&self, window_id: &str) -> Option<&WindowState> {
        self.window(window_id).filter(|w| !w.tracked)
    }

    fn framed_mut(&mut self, window_id: &str) -> Option<&mut WindowState> {
        self.window_mut(window_id).filter(|w| !w.tracked)
    }

    pub fn active_window(&self) -> Option<&str> {
        self.active_window.as_deref()
    }

    pub fn current_desktop(&self) -> u32 {
        self.current_desktop
    }

    pub fn layout(&self) -> &ScreenLayout {
        &self.layout
    }

    pub fn config(&self) -> &UserConfig {
        &self.config
    }

    pub fn stats(&self) -> &SystemStats {
        &self.stats
    }

    pub fn overlays(&self) -> Overlays {
        self.overlays
    }

    pub fn toasts(&self) -> &[Toast] {
        self.toasts.list()
    }

    pub fn apps(&self) -> &[AppDefinition] {
        &self.apps
    }

    pub fn app(&self, app_id: &str) -> Option<&AppDefinition> {
        self.apps.iter().find(|a| a.id == app_id)
    }

    pub fn drag_session(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    /// Shown on the current desktop and selectable by the switcher.
    pub fn is_eligible(&self, window: &WindowState) -> bool {
        window.desktop_id == self.current_desktop
            && !window.minimized
            && !window.is_tracking_record()
    }

    /// Eligible windows in registry order.
    pub fn eligible_windows(&self) -> Vec<&WindowState> {
        self.windows.iter().filter(|w| self.is_eligible(w)).collect()
    }

    /// Eligible windows back to front.
    pub fn render_order(&self) -> Vec<&WindowState> {
        let mut windows = self.eligible_windows();
        windows.sort_by_key(|w| w.z_index);
        windows
    }

    /// Every window back to front, regardless of desktop.
    pub fn windows_by_z(&self) -> Vec<WindowState> {
        let mut windows = self.windows.clone();
        windows.sort_by_key(|w| w.z_index);
        windows
    }

    pub fn snapshot(&self) -> DesktopState {
        DesktopState {
            windows: self.windows.clone(),
            active_window: self.active_window.clone(),
            current_desktop: self.current_desktop,
            apps: self.apps.clone(),
            switcher: self.switcher.view(),
            overlays: self.overlays,
            toasts: self.toasts.list().to_vec(),
            config: self.config.clone(),
        }
    }

    // ------------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------------

    fn take_z_index(&mut self) -> u32 {
        let z = self.next_z_index;
        self.next_z_index += 1;
        z
    }

    fn next_window_id(&mut self, app_id: &str) -> String {
        let now = Utc::now().timestamp_millis();
        let stamp = now.max(self.last_id_millis + 1);
        self.last_id_millis = stamp;
        format!("{app_id}-{stamp}")
    }

    // ------------------------------------------------------------------------
    // App registry
    // ------------------------------------------------------------------------

    /// Adds or replaces an app definition.
    pub fn register_app(&mut self, app: AppDefinition) {
        match self.apps.iter_mut().find(|a| a.id == app.id) {
            Some(existing) => *existing = app.clone(),
            None => self.apps.push(app.clone()),
        }
        self.emit(DesktopEvent::AppRegistered { app });
    }

    // ------------------------------------------------------------------------
    // Window lifecycle
    // ------------------------------------------------------------------------

    /// Opens a framed window for a registered app and makes it active.
    pub fn open_window(
        &mut self,
        app_id: &str,
        title: Option<String>,
        props: Option<Value>,
    ) -> Result<WindowState, DesktopError> {
        let app = self
            .app(app_id)
            .cloned()
            .ok_or_else(|| DesktopError::AppNotFound(app_id.to_string()))?;
        if self.config.disabled_apps.iter().any(|id| id == app_id) {
            return Err(DesktopError::AppDisabled(app_id.to_string()));
        }

        let (x, y) = self.layout.cascade_origin(self.windows.len());
        let (width, height) = clamp_size(app.default_width, app.default_height);
        let window = WindowState {
            id: self.next_window_id(app_id),
            app_id: app_id.to_string(),
            title: title.unwrap_or(app.name),
            x,
            y,
            width,
            height,
            z_index: self.take_z_index(),
            minimized: false,
            maximized: false,
            external: app.external,
            tracked: false,
            desktop_id: self.current_desktop,
            props: props.unwrap_or(Value::Null),
        };

        self.windows.push(window.clone());
        self.active_window = Some(window.id.clone());
        tracing::info!(
            window_id = %window.id,
            app_id = %window.app_id,
            z_index = window.z_index,
            "Window opened"
        );
        self.emit(DesktopEvent::WindowOpened {
            window: window.clone(),
        });
        self.dismiss_overlays();

        Ok(window)
    }

    /// Records an externally launched process so the taskbar can list it.
    ///
    /// The record has no frame: zero geometry, z-index 0, never active.
    pub fn track_external(&mut self, app_id: &str, title: Option<String>) -> WindowState {
        let title = title
            .or_else(|| self.app(app_id).map(|a| a.name.clone()))
            .unwrap_or_else(|| app_id.to_string());
        let window = WindowState {
            id: self.next_window_id(app_id),
            app_id: app_id.to_string(),
            title,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            z_index: 0,
            minimized: false,
            maximized: false,
            external: true,
            tracked: true,
            desktop_id: self.current_desktop,
            props: Value::Null,
        };
        self.windows.push(window.clone());
        tracing::info!(window_id = %window.id, app_id = %app_id, "Tracking external process");
        self.emit(DesktopEvent::WindowOpened {
            window: window.clone(),
        });
        window
    }

    /// Removes a window. Closing the active window leaves nothing active.
    pub fn close_window(&mut self, window_id: &str) -> Option<WindowState> {
        let index = self.windows.iter().position(|w| w.id == window_id)?;
        let window = self.windows.remove(index);

        if self.active_window.as_deref() == Some(window_id) {
            self.active_window = None;
        }
        self.drop_sessions_for(window_id);

        tracing::info!(window_id = %window_id, app_id = %window.app_id, "Window closed");
        self.emit(DesktopEvent::WindowClosed {
            window_id: window_id.to_string(),
        });
        self.prune_switcher();
        Some(window)
    }

    /// Raises a window and makes it active. Un-minimizes if needed.
    pub fn focus_window(&mut self, window_id: &str) -> Option<u32> {
        self.framed(window_id)?;
        let z_index = self.take_z_index();
        let window = self.window_mut(window_id)?;
        let was_minimized = window.minimized;
        window.z_index = z_index;
        window.minimized = false;
        self.active_window = Some(window_id.to_string());

        tracing::debug!(window_id = %window_id, z_index, "Window focused");
        let window_id = window_id.to_string();
        if was_minimized {
            self.emit(DesktopEvent::WindowRestored { window_id, z_index });
        } else {
            self.emit(DesktopEvent::WindowFocused { window_id, z_index });
        }
        Some(z_index)
    }

    pub fn minimize_window(&mut self, window_id: &str) -> bool {
        let Some(window) = self.framed_mut(window_id) else {
            return false;
        };
        window.minimized = true;
        if self.active_window.as_deref() == Some(window_id) {
            self.active_window = None;
        }
        self.drop_sessions_for(window_id);

        tracing::debug!(window_id = %window_id, "Window minimized");
        self.emit(DesktopEvent::WindowMinimized {
            window_id: window_id.to_string(),
        });
        self.prune_switcher();
        true
    }

    /// Toggles the maximized flag, then focuses. Returns the new flag.
    ///
    /// Stored geometry is kept as the restore geometry.
    pub fn maximize_window(&mut self, window_id: &str) -> Option<bool> {
        let window = self.framed_mut(window_id)?;
        window.maximized = !window.maximized;
        let maximized = window.maximized;
        self.drop_sessions_for(window_id);

        self.emit(DesktopEvent::WindowMaximized {
            window_id: window_id.to_string(),
            maximized,
        });
        self.focus_window(window_id);
        Some(maximized)
    }

    /// Commits a position directly.
    pub fn move_window(&mut self, window_id: &str, x: i32, y: i32) -> bool {
        let Some(window) = self.framed_mut(window_id) else {
            return false;
        };
        window.x = x;
        window.y = y;
        self.emit(DesktopEvent::WindowMoved {
            window_id: window_id.to_string(),
            x,
            y,
        });
        true
    }

    /// Commits a size directly, clamped to the minimum.
    pub fn resize_window(&mut self, window_id: &str, width: i32, height: i32) -> Option<(i32, i32)> {
        let (width, height) = clamp_size(width, height);
        let window = self.framed_mut(window_id)?;
        window.width = width;
        window.height = height;
        self.emit(DesktopEvent::WindowResized {
            window_id: window_id.to_string(),
            width,
            height,
        });
        Some((width, height))
    }

    /// Minimized: restore and focus. Active: minimize. Otherwise: focus.
    /// Tracking records have nothing to raise, so clicks on them do nothing.
    pub fn toggle_from_taskbar(&mut self, window_id: &str) -> Option<TaskbarAction> {
        let window = self.framed(window_id)?;
        if window.minimized {
            self.focus_window(window_id);
            Some(TaskbarAction::Restored)
        } else if self.active_window.as_deref() == Some(window_id) {
            self.minimize_window(window_id);
            Some(TaskbarAction::Minimized)
        } else {
            self.focus_window(window_id);
            Some(TaskbarAction::Focused)
        }
    }

    /// Changes which desktop is shown. Windows keep their `desktop_id`.
    pub fn switch_desktop(&mut self, desktop_id: u32) -> bool {
        if self.current_desktop == desktop_id {
            return false;
        }
        self.current_desktop = desktop_id;
        self.drag = None;
        self.resize = None;
        tracing::info!(desktop_id, "Switched desktop");
        self.emit(DesktopEvent::DesktopSwitched { desktop_id });
        self.prune_switcher();
        true
    }

    fn drop_sessions_for(&mut self, window_id: &str) {
        if self.drag.as_ref().is_some_and(|d| d.window_id == window_id) {
            self.drag = None;
        }
        if self.resize.as_ref().is_some_and(|r| r.window_id == window_id) {
            self.resize = None;
        }
    }

    // ------------------------------------------------------------------------
    // Drag sessions
    // ------------------------------------------------------------------------

    /// Starts dragging. Refused for maximized, hidden, or unknown windows,
    /// and while another source has a gesture in flight.
    pub fn begin_drag(
        &mut self,
        source: InputSource,
        window_id: &str,
        pointer: Point,
    ) -> Option<DragFrame> {
        if self.gesture_held_by_other(source) {
            return None;
        }
        let window = self.framed(window_id)?;
        if window.maximized || !self.is_eligible(window) {
            return None;
        }
        let frame = window.geometry();
        self.focus_window(window_id);
        self.resize = None;

        let session = DragSession::begin(source, window_id, frame, pointer);
        let first = session.frame();
        self.drag = Some(session);
        Some(first)
    }

    /// Moves the live drag. The registry is not touched.
    pub fn drag_to(&mut self, source: InputSource, pointer: Point) -> Option<DragFrame> {
        let session = self.drag.as_mut().filter(|d| d.source == source)?;
        Some(session.update(pointer, &self.layout))
    }

    /// Ends the drag and writes the final geometry.
    pub fn end_drag(&mut self, source: InputSource) -> Option<WindowState> {
        if self.drag.as_ref()?.source != source {
            return None;
        }
        let session = self.drag.take()?;
        let window_id = session.window_id.clone();
        let screen_width = self.layout.width;
        let window = self.window_mut(&window_id)?;

        match session.finish() {
            DragCommit::Move { x, y } => {
                window.x = x;
                window.y = y;
                let committed = window.clone();
                self.emit(DesktopEvent::WindowMoved { window_id, x, y });
                Some(committed)
            }
            DragCommit::Snap(proposal) => {
                let Rect {
                    x,
                    y,
                    width,
                    height,
                } = proposal.rect;
                window.x = x;
                window.y = y;
                window.width = width;
                window.height = height;
                window.maximized = width == screen_width;
                let committed = window.clone();
                tracing::debug!(window_id = %window_id, zone = ?proposal.zone, "Window snapped");
                self.emit(DesktopEvent::WindowGeometry {
                    window: committed.clone(),
                });
                Some(committed)
            }
        }
    }

    pub fn cancel_drag(&mut self, source: InputSource) -> bool {
        if self.drag.as_ref().is_some_and(|d| d.source == source) {
            self.drag = None;
            return true;
        }
        false
    }

    fn gesture_held_by_other(&self, source: InputSource) -> bool {
        self.drag.as_ref().is_some_and(|d| d.source != source)
            || self.resize.as_ref().is_some_and(|r| r.source != source)
    }

    // ------------------------------------------------------------------------
    // Resize sessions
    // ------------------------------------------------------------------------

    pub fn begin_resize(
        &mut self,
        source: InputSource,
        window_id: &str,
        edges: ResizeEdges,
        pointer: Point,
    ) -> Option<ResizeFrame> {
        if self.gesture_held_by_other(source) {
            return None;
        }
        let window = self.framed(window_id)?;
        if window.maximized || !self.is_eligible(window) {
            return None;
        }
        let frame = window.geometry();
        self.focus_window(window_id);
        self.drag = None;

        let session = ResizeSession::begin(source, window_id, frame, edges, pointer);
        let first = ResizeFrame {
            window_id: window_id.to_string(),
            rect: session.live_rect(),
        };
        self.resize = Some(session);
        Some(first)
    }

    pub fn resize_to(&mut self, source: InputSource, pointer: Point) -> Option<ResizeFrame> {
        let session = self.resize.as_mut().filter(|r| r.source == source)?;
        Some(session.update(pointer))
    }

    pub fn end_resize(&mut self, source: InputSource) -> Option<WindowState> {
        if self.resize.as_ref()?.source != source {
            return None;
        }
        let session = self.resize.take()?;
        let window_id = session.window_id.clone();
        let rect = session.finish();
        let window = self.window_mut(&window_id)?;
        window.x = rect.x;
        window.y = rect.y;
        window.width = rect.width;
        window.height = rect.height;
        let committed = window.clone();
        self.emit(DesktopEvent::WindowGeometry {
            window: committed.clone(),
        });
        Some(committed)
    }

    /// Geometry a live drag or resize currently shows for `window_id`.
    pub fn live_geometry(&self, window_id: &str) -> Option<Rect> {
        if let Some(drag) = self.drag.as_ref().filter(|d| d.window_id == window_id) {
            return Some(drag.live_rect());
        }
        if let Some(resize) = self.resize.as_ref().filter(|r| r.window_id == window_id) {
            return Some(resize.live_rect());
        }
        None
    }

    // ------------------------------------------------------------------------
    // Keyboard: switcher and super-key taps
    // ------------------------------------------------------------------------

    pub fn key_down(&mut self, key: Key, now: Instant) -> KeyOutcome {
        match key {
            Key::Alt => {
                self.super_tap.cancel();
                self.switcher.modifier_down();
            }
            Key::Tab => {
                self.super_tap.cancel();
                let eligible = self
                    .eligible_windows()
                    .into_iter()
                    .map(|w| w.id.clone())
                    .collect();
                let active = self.active_window.clone();
                if self.switcher.advance(eligible, active.as_deref()) {
                    self.emit_switcher();
                }
            }
            Key::Super => match self.super_tap.press(now) {
                TapOutcome::Pending { generation, delay } => {
                    return KeyOutcome::SingleTapPending { generation, delay };
                }
                TapOutcome::DoubleTap => {
                    self.open_overlay(OverlayKind::Launcher);
                }
            },
            Key::Other => self.super_tap.cancel(),
        }
        KeyOutcome::Handled
    }

    /// Releasing Alt commits the highlighted window.
    pub fn key_up(&mut self, key: Key) -> Option<String> {
        if key != Key::Alt {
            return None;
        }
        let was_visible = self.switcher.is_visible();
        let target = self.switcher.modifier_up();
        if was_visible {
            self.emit_switcher();
        }
        let target = target?;
        self.focus_window(&target)?;
        Some(target)
    }

    /// The deferred single-tap timer fired.
    pub fn single_tap_due(&mut self, generation: u64) -> bool {
        if !self.super_tap.fire_single(generation) {
            return false;
        }
        self.toggle_overlay(OverlayKind::StartMenu);
        true
    }

    fn prune_switcher(&mut self) {
        let eligible: Vec<String> = self
            .eligible_windows()
            .into_iter()
            .map(|w| w.id.clone())
            .collect();
        if self.switcher.retain(|id| eligible.iter().any(|e| e == id)) {
            self.emit_switcher();
        }
    }

    fn emit_switcher(&self) {
        self.emit(DesktopEvent::SwitcherChanged {
            switcher: self.switcher.view(),
        });
    }

    // ------------------------------------------------------------------------
    // Overlays
    // ------------------------------------------------------------------------

    /// Opens `kind` if closed, closes it if open. Others always close.
    pub fn toggle_overlay(&mut self, kind: OverlayKind) -> Overlays {
        let was_open = overlay_flag(&self.overlays, kind);
        let mut next = Overlays::default();
        if !was_open {
            set_overlay_flag(&mut next, kind);
        }
        self.set_overlays(next);
        self.overlays
    }

    pub fn open_overlay(&mut self, kind: OverlayKind) -> Overlays {
        let mut next = Overlays::default();
        set_overlay_flag(&mut next, kind);
        self.set_overlays(next);
        self.overlays
    }

    /// Closes every overlay. Returns true when something was open.
    pub fn dismiss_overlays(&mut self) -> bool {
        if !self.overlays.any_open() {
            return false;
        }
        self.set_overlays(Overlays::default());
        true
    }

    fn set_overlays(&mut self, next: Overlays) {
        if self.overlays != next {
            self.overlays = next;
            self.emit(DesktopEvent::OverlaysChanged { overlays: next });
        }
    }

    // ------------------------------------------------------------------------
    // Toasts and configuration
    // ------------------------------------------------------------------------

    pub fn push_toast(
        &mut self,
        level: ToastLevel,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Toast {
        let toast = self.toasts.push(level, title, message);
        self.emit(DesktopEvent::ToastPushed {
            toast: toast.clone(),
        });
        toast
    }

    pub fn dismiss_toast(&mut self, toast_id: &str) -> bool {
        if !self.toasts.dismiss(toast_id) {
            return false;
        }
        self.emit(DesktopEvent::ToastDismissed {
            toast_id: toast_id.to_string(),
        });
        true
    }

    /// Replaces the user configuration. Returns false when unchanged.
    pub fn apply_config(&mut self, config: UserConfig) -> bool {
        if self.config == config {
            return false;
        }
        self.layout.bar_position = config.bar_position;
        self.config = config.clone();
        self.emit(DesktopEvent::ConfigChanged { config });
        true
    }

    /// Stores the latest polled stats. Only changes are broadcast.
    pub fn update_stats(&mut self, stats: SystemStats) -> bool {
        if self.stats == stats {
            return false;
        }
        self.stats = stats.clone();
        self.emit(DesktopEvent::StatsUpdated { stats });
        true
    }
}

fn overlay_flag(overlays: &Overlays, kind: OverlayKind) -> bool {
    match kind {
        OverlayKind::StartMenu => overlays.start_menu,
        OverlayKind::Launcher => overlays.launcher,
        OverlayKind::ControlCenter => overlays.control_center,
        OverlayKind::Notifications => overlays.notifications,
    }
}

fn set_overlay_flag(overlays: &mut Overlays, kind: OverlayKind) {
    match kind {
        OverlayKind::StartMenu => overlays.start_menu = true,
        OverlayKind::Launcher => overlays.launcher = true,
        OverlayKind::ControlCenter => overlays.control_center = true,
        OverlayKind::Notifications => overlays.notifications = true,
    }
}
