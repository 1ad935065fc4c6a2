//! Pointer-driven drag and resize sessions.
//!
//! A session owns the in-flight geometry. Nothing is written to the window
//! registry until the session ends, so the taskbar and switcher only ever
//! observe committed positions.

use serde::{Deserialize, Serialize};
use shared_types::Rect;

use super::geometry::{ResizeEdges, ScreenLayout, SnapProposal};

/// Identifies the connection driving a gesture. Only that connection may
/// move, end or cancel it.
pub type InputSource = u64;

/// Pointer position in screen coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Transient frame sent back to the dragging client only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragFrame {
    pub window_id: String,
    pub x: i32,
    pub y: i32,
    /// Phantom rectangle the window would snap to on release
    pub snap: Option<SnapProposal>,
}

/// What a finished drag writes to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragCommit {
    Move { x: i32, y: i32 },
    Snap(SnapProposal),
}

#[derive(Debug, Clone)]
pub struct DragSession {
    pub window_id: String,
    pub source: InputSource,
    grab_offset: Point,
    live: Rect,
    snap: Option<SnapProposal>,
}

impl DragSession {
    pub fn begin(source: InputSource, window_id: impl Into<String>, frame: Rect, pointer: Point) -> Self {
        Self {
            window_id: window_id.into(),
            source,
            grab_offset: Point::new(pointer.x - frame.x, pointer.y - frame.y),
            live: frame,
            snap: None,
        }
    }

    pub fn update(&mut self, pointer: Point, layout: &ScreenLayout) -> DragFrame {
        self.live.x = pointer.x - self.grab_offset.x;
        self.live.y = pointer.y - self.grab_offset.y;
        self.snap = layout.snap_proposal(self.live);
        self.frame()
    }

    pub fn frame(&self) -> DragFrame {
        DragFrame {
            window_id: self.window_id.clone(),
            x: self.live.x,
            y: self.live.y,
            snap: self.snap,
        }
    }

    pub fn live_rect(&self) -> Rect {
        self.live
    }

    pub fn finish(self) -> DragCommit {
        match self.snap {
            Some(proposal) => DragCommit::Snap(proposal),
            None => DragCommit::Move {
                x: self.live.x,
                y: self.live.y,
            },
        }
    }
}

/// Transient frame for an in-flight resize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeFrame {
    pub window_id: String,
    pub rect: Rect,
}

#[derive(Debug, Clone)]
pub struct ResizeSession {
    pub window_id: String,
    pub source: InputSource,
    edges: ResizeEdges,
    start: Rect,
    origin: Point,
    live: Rect,
}

impl ResizeSession {
    pub fn begin(
        source: InputSource,
        window_id: impl Into<String>,
        frame: Rect,
        edges: ResizeEdges,
        pointer: Point,
    ) -> Self {
        Self {
            window_id: window_id.into(),
            source,
            edges,
            start: frame,
            origin: pointer,
            live: frame,
        }
    }

    pub fn update(&mut self, pointer: Point) -> ResizeFrame {
        self.live = self
            .edges
            .apply(self.start, pointer.x - self.origin.x, pointer.y - self.origin.y);
        ResizeFrame {
            window_id: self.window_id.clone(),
            rect: self.live,
        }
    }

    pub fn live_rect(&self) -> Rect {
        self.live
    }

    pub fn finish(self) -> Rect {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::geometry::SnapZone;

    #[test]
    fn test_drag_keeps_grab_offset() {
        let layout = ScreenLayout::default();
        let mut drag = DragSession::begin(1, "w", Rect::new(180, 130, 800, 600), Point::new(190, 140));
        let frame = drag.update(Point::new(400, 300), &layout);
        assert_eq!((frame.x, frame.y), (390, 290));
        assert!(frame.snap.is_none());
        assert_eq!(drag.finish(), DragCommit::Move { x: 390, y: 290 });
    }

    #[test]
    fn test_drag_to_left_edge_proposes_left_half() {
        let layout = ScreenLayout::default();
        let mut drag = DragSession::begin(1, "w", Rect::new(180, 130, 800, 600), Point::new(190, 140));
        let frame = drag.update(Point::new(15, 410), &layout);
        assert_eq!((frame.x, frame.y), (5, 400));
        let snap = frame.snap.expect("snap proposal");
        assert_eq!(snap.zone, SnapZone::Left);

        // Moving back out clears the proposal
        assert!(drag.update(Point::new(400, 410), &layout).snap.is_none());
    }

    #[test]
    fn test_resize_session_tracks_from_start() {
        let mut resize = ResizeSession::begin(
            1,
            "w",
            Rect::new(100, 100, 400, 300),
            ResizeEdges::parse("se").unwrap(),
            Point::new(500, 400),
        );
        resize.update(Point::new(520, 410));
        let frame = resize.update(Point::new(600, 450));
        assert_eq!(frame.rect, Rect::new(100, 100, 500, 350));
        assert_eq!(resize.finish(), Rect::new(100, 100, 500, 350));
    }
}
