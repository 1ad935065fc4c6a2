//! Surface coordinate bridge (window swallowing).
//!
//! External windows render a transparent placeholder; the real surface is
//! composited by another process at the same screen rectangle. The bridge
//! keeps one [`SurfaceWatch`] per external window and reports the
//! placeholder rectangle to the compositor whenever it visibly changes.

pub mod mapper;
pub mod watch;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shared_types::{Rect, WindowState};

use crate::backend::compositor::CompositorBridge;
use crate::wm::geometry::content_rect;
use crate::wm::WindowManager;

pub use mapper::{BoundingBox, SurfaceMapper};
pub use watch::{Placeholder, SharedMapper, SurfaceWatch, FRAME_INTERVAL};

#[derive(Debug, thiserror::Error, Clone)]
pub enum SurfaceError {
    #[error("Compositor socket unavailable: {0}")]
    Connect(String),

    #[error("Failed to encode surface report: {0}")]
    Encode(String),

    #[error("Compositor connection closed")]
    Closed,
}

pub struct SurfaceBridge {
    mapper: SharedMapper,
    watches: HashMap<String, SurfaceWatch>,
    /// Frame each window was last synced with
    frames: HashMap<String, ShownFrame>,
    /// UI-measured windows, keyed to the frame the measurement belongs to
    measured: HashMap<String, ShownFrame>,
    frame_interval: Duration,
}

impl SurfaceBridge {
    pub fn new(compositor: Arc<dyn CompositorBridge>) -> Self {
        Self::with_frame_interval(compositor, FRAME_INTERVAL)
    }

    pub fn with_frame_interval(compositor: Arc<dyn CompositorBridge>, frame_interval: Duration) -> Self {
        Self {
            mapper: Arc::new(Mutex::new(SurfaceMapper::new(compositor))),
            watches: HashMap::new(),
            frames: HashMap::new(),
            measured: HashMap::new(),
            frame_interval,
        }
    }

    /// Brings watches in line with the registry: attaches new external
    /// windows, updates placeholders and activity, tears down closed ones.
    pub fn sync_windows(&mut self, manager: &WindowManager) {
        let active = manager.active_window();

        for window in manager.windows().iter().filter(|w| hosts_surface(w)) {
            let is_active = active == Some(window.id.as_str());
            let shown = shown_frame(manager, window);
            self.frames.insert(window.id.clone(), shown);

            // A measurement only holds for the frame it was taken in
            if self.measured.get(&window.id).is_some_and(|m| *m != shown) {
                self.measured.remove(&window.id);
            }
            let derived = if self.measured.contains_key(&window.id) {
                None
            } else {
                Some(shown.frame.map(|frame| BoundingBox::from(content_rect(frame))))
            };

            match self.watches.get(&window.id) {
                Some(watch) => {
                    if let Some(bounds) = derived {
                        watch.placeholder().set(bounds);
                    }
                    watch.set_active(is_active);
                }
                None => {
                    let placeholder = Arc::new(Placeholder::new(derived.flatten()));
                    let watch = SurfaceWatch::spawn(
                        window.app_id.clone(),
                        placeholder,
                        self.mapper.clone(),
                        is_active,
                        self.frame_interval,
                    );
                    tracing::debug!(window_id = %window.id, app_id = %window.app_id, "Surface attached");
                    self.watches.insert(window.id.clone(), watch);
                }
            }
        }

        let stale: Vec<String> = self
            .watches
            .keys()
            .filter(|id| manager.window(id).is_none())
            .cloned()
            .collect();
        for window_id in stale {
            self.detach(&window_id);
        }
    }

    /// Placeholder box measured by the UI. It replaces the derived box until
    /// the window's frame or maximized state changes.
    pub fn report_measured(&mut self, window_id: &str, bounds: BoundingBox) -> bool {
        let Some(watch) = self.watches.get(window_id) else {
            return false;
        };
        let Some(shown) = self.frames.get(window_id).copied() else {
            return false;
        };
        self.measured.insert(window_id.to_string(), shown);
        watch.placeholder().set(Some(bounds));
        true
    }

    pub fn detach(&mut self, window_id: &str) -> bool {
        self.measured.remove(window_id);
        self.frames.remove(window_id);
        let Some(watch) = self.watches.remove(window_id) else {
            return false;
        };
        let app_id = watch.app_id().to_string();
        drop(watch);
        if let Ok(mut mapper) = self.mapper.lock() {
            mapper.forget(&app_id);
        }
        tracing::debug!(window_id = %window_id, app_id = %app_id, "Surface detached");
        true
    }

    pub fn detach_all(&mut self) {
        let ids: Vec<String> = self.watches.keys().cloned().collect();
        for window_id in ids {
            self.detach(&window_id);
        }
    }

    pub fn is_attached(&self, window_id: &str) -> bool {
        self.watches.contains_key(window_id)
    }

    pub fn is_polling(&self, window_id: &str) -> bool {
        self.watches.get(window_id).is_some_and(SurfaceWatch::is_active)
    }

    pub fn attached_count(&self) -> usize {
        self.watches.len()
    }
}

/// Framed external windows own a placeholder; tracking records do not.
fn hosts_surface(window: &WindowState) -> bool {
    window.external && !window.is_tracking_record()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ShownFrame {
    /// `None` while not visible
    frame: Option<Rect>,
    maximized: bool,
}

/// Frame as currently shown, including any live drag or resize.
fn shown_frame(manager: &WindowManager, window: &WindowState) -> ShownFrame {
    let frame = manager.is_eligible(window).then(|| {
        manager.live_geometry(&window.id).unwrap_or_else(|| {
            if window.maximized {
                manager.layout().maximized_rect()
            } else {
                window.geometry()
            }
        })
    });
    ShownFrame {
        frame,
        maximized: window.maximized,
    }
}
