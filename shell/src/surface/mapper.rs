use std::collections::HashMap;
use std::sync::Arc;

use shared_types::{Rect, SurfaceRect};

use crate::backend::compositor::CompositorBridge;

/// Unrounded on-screen bounding box of a placeholder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn round(&self) -> Rect {
        Rect::new(
            self.left.round() as i32,
            self.top.round() as i32,
            self.width.round() as i32,
            self.height.round() as i32,
        )
    }
}

impl From<Rect> for BoundingBox {
    fn from(rect: Rect) -> Self {
        Self::new(
            rect.x as f64,
            rect.y as f64,
            rect.width as f64,
            rect.height as f64,
        )
    }
}

/// Rounds placeholder boxes and forwards them, once per visible change.
pub struct SurfaceMapper {
    compositor: Arc<dyn CompositorBridge>,
    last_sent: HashMap<String, Rect>,
}

impl SurfaceMapper {
    pub fn new(compositor: Arc<dyn CompositorBridge>) -> Self {
        Self {
            compositor,
            last_sent: HashMap::new(),
        }
    }

    /// Returns true when a report went out.
    pub fn sync(&mut self, app_id: &str, bounds: BoundingBox) -> bool {
        let rect = bounds.round();
        if self.last_sent.get(app_id) == Some(&rect) {
            return false;
        }
        self.last_sent.insert(app_id.to_string(), rect);
        self.compositor.report_surface(SurfaceRect {
            app_id: app_id.to_string(),
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        });
        true
    }

    /// Drops dedup state so a later surface with the same app id reports fresh.
    pub fn forget(&mut self, app_id: &str) {
        self.last_sent.remove(app_id);
    }

    pub fn last_sent(&self, app_id: &str) -> Option<Rect> {
        self.last_sent.get(app_id).copied()
    }
}
