//! Shared types between the window-manager core and the frontend shell
//!
//! These types are used by both:
//! - the `shell` crate (window registry, actors, HTTP/WebSocket API)
//! - the TypeScript UI (via generated `ts-rs` bindings)
//!
//! Serializable with serde for JSON over WebSocket/HTTP

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Minimum width a window can be resized to
pub const MIN_WINDOW_WIDTH: i32 = 300;
/// Minimum height a window can be resized to
pub const MIN_WINDOW_HEIGHT: i32 = 200;
/// Fallback size for apps that do not declare one
pub const DEFAULT_WINDOW_WIDTH: i32 = 800;
pub const DEFAULT_WINDOW_HEIGHT: i32 = 600;

// ============================================================================
// Windows
// ============================================================================

/// Individual window state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct WindowState {
    pub id: String,
    pub app_id: String,
    pub title: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub z_index: u32,
    pub minimized: bool,
    pub maximized: bool,
    /// Content is composited by an external process into a placeholder
    pub external: bool,
    /// Taskbar-only record for a process launched outside any frame
    #[serde(default)]
    pub tracked: bool,
    pub desktop_id: u32,
    #[ts(type = "unknown")]
    pub props: serde_json::Value,
}

impl WindowState {
    pub fn geometry(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Taskbar-only record for a process launched outside the window frame.
    pub fn is_tracking_record(&self) -> bool {
        self.tracked
    }
}

/// Integer rectangle in screen pixels (top-left origin)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Screen rectangle reported to the external compositor for one app surface
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct SurfaceRect {
    pub app_id: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl SurfaceRect {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

// ============================================================================
// Apps
// ============================================================================

/// App definition for dynamic app registration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct AppDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default = "default_width")]
    pub default_width: i32,
    #[serde(default = "default_height")]
    pub default_height: i32,
    /// Window content is a real OS surface launched from `exec`
    #[serde(default)]
    pub external: bool,
    #[serde(default)]
    pub exec: Option<String>,
}

fn default_width() -> i32 {
    DEFAULT_WINDOW_WIDTH
}

fn default_height() -> i32 {
    DEFAULT_WINDOW_HEIGHT
}

// ============================================================================
// Desktop snapshot
// ============================================================================

/// Desktop state - all windows, focus, and shell chrome
#[derive(Debug, Clone, Serialize, Deserialize, Default, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct DesktopState {
    /// Registry order (insertion order, not z-order)
    pub windows: Vec<WindowState>,
    pub active_window: Option<String>,
    pub current_desktop: u32,
    pub apps: Vec<AppDefinition>,
    pub switcher: SwitcherView,
    pub overlays: Overlays,
    pub toasts: Vec<Toast>,
    pub config: UserConfig,
}

/// Alt+Tab switcher as seen by the UI
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct SwitcherView {
    pub visible: bool,
    pub selected_index: usize,
    /// Snapshot of eligible window ids, in registry order
    pub window_ids: Vec<String>,
}

/// Transient shell overlays
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct Overlays {
    pub start_menu: bool,
    pub launcher: bool,
    pub control_center: bool,
    pub notifications: bool,
}

impl Overlays {
    pub fn any_open(&self) -> bool {
        self.start_menu || self.launcher || self.control_center || self.notifications
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub enum OverlayKind {
    StartMenu,
    Launcher,
    ControlCenter,
    Notifications,
}

/// One taskbar slot, derived from pinned apps and open windows
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct TaskbarEntry {
    pub app_id: String,
    pub window_id: Option<String>,
    pub pinned: bool,
    pub open: bool,
    pub active: bool,
    pub minimized: bool,
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Transient user-visible notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct Toast {
    pub id: String,
    pub level: ToastLevel,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Backend records
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub enum BarPosition {
    #[default]
    Top,
    Bottom,
}

/// Persisted user configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(default)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct UserConfig {
    pub wallpaper: String,
    pub theme_name: String,
    pub accent_color: String,
    pub display_scale: f64,
    pub bar_position: BarPosition,
    pub disabled_apps: Vec<String>,
    pub pinned_apps: Vec<String>,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            wallpaper: "https://images.unsplash.com/photo-1451187580459-43490279c0fa?q=80&w=2072&auto=format&fit=crop".to_string(),
            theme_name: "blue-default".to_string(),
            accent_color: "blue".to_string(),
            display_scale: 1.0,
            bar_position: BarPosition::Top,
            disabled_apps: Vec::new(),
            pinned_apps: vec![
                "terminal".to_string(),
                "explorer".to_string(),
                "blue_software".to_string(),
                "settings".to_string(),
            ],
        }
    }
}

/// Polled system status for the control center and bar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct SystemStats {
    pub battery: f32,
    pub is_charging: bool,
    pub volume: u8,
    pub brightness: u8,
    pub cpu_usage: f32,
    pub ram_usage: f32,
    pub wifi_ssid: String,
}

impl Default for SystemStats {
    fn default() -> Self {
        Self {
            battery: 100.0,
            is_charging: false,
            volume: 50,
            brightness: 70,
            cpu_usage: 0.0,
            ram_usage: 0.0,
            wifi_ssid: "Disconnected".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
}

// ============================================================================
// Change notifications
// ============================================================================

/// Emitted after every committed mutation of the desktop model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub enum DesktopEvent {
    WindowOpened { window: WindowState },
    WindowClosed { window_id: String },
    WindowFocused { window_id: String, z_index: u32 },
    WindowMinimized { window_id: String },
    WindowRestored { window_id: String, z_index: u32 },
    WindowMaximized { window_id: String, maximized: bool },
    WindowMoved { window_id: String, x: i32, y: i32 },
    WindowResized { window_id: String, width: i32, height: i32 },
    WindowGeometry { window: WindowState },
    DesktopSwitched { desktop_id: u32 },
    SwitcherChanged { switcher: SwitcherView },
    OverlaysChanged { overlays: Overlays },
    AppRegistered { app: AppDefinition },
    ToastPushed { toast: Toast },
    ToastDismissed { toast_id: String },
    ConfigChanged { config: UserConfig },
    StatsUpdated { stats: SystemStats },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_config_fills_missing_fields() {
        let config: UserConfig =
            serde_json::from_str(r#"{"theme_name":"dracula","bar_position":"bottom"}"#).unwrap();
        assert_eq!(config.theme_name, "dracula");
        assert_eq!(config.bar_position, BarPosition::Bottom);
        assert_eq!(config.accent_color, "blue");
        assert_eq!(config.pinned_apps.len(), 4);
    }

    #[test]
    fn test_app_definition_defaults_size() {
        let app: AppDefinition =
            serde_json::from_str(r#"{"id":"calculator","name":"Calculator"}"#).unwrap();
        assert_eq!(app.default_width, DEFAULT_WINDOW_WIDTH);
        assert_eq!(app.default_height, DEFAULT_WINDOW_HEIGHT);
        assert!(!app.external);
        assert!(app.exec.is_none());
    }

    #[test]
    fn test_desktop_event_is_tagged() {
        let event = DesktopEvent::WindowClosed {
            window_id: "terminal-1".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "window_closed");
        assert_eq!(json["window_id"], "terminal-1");
    }

    #[test]
    fn test_tracking_record_detection() {
        let mut window = WindowState {
            id: "firefox-1".to_string(),
            app_id: "firefox".to_string(),
            title: "Firefox".to_string(),
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            z_index: 0,
            minimized: false,
            maximized: false,
            external: true,
            tracked: true,
            desktop_id: 0,
            props: serde_json::json!({}),
        };
        assert!(window.is_tracking_record());

        // Geometry does not decide it
        window.width = 640;
        window.height = 480;
        assert!(window.is_tracking_record());

        window.tracked = false;
        assert!(!window.is_tracking_record());
        let json = serde_json::to_value(&window).unwrap();
        assert_eq!(json["tracked"], false);
    }
}
