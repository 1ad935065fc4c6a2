//! Screen layout, snap zones, and resize arithmetic.

use serde::{Deserialize, Serialize};
use shared_types::{BarPosition, Rect, MIN_WINDOW_HEIGHT, MIN_WINDOW_WIDTH};

/// Distance in pixels from a screen edge that arms a snap proposal.
pub const SNAP_THRESHOLD: i32 = 20;

/// Height of a window frame's title bar; the placeholder sits below it.
pub const TITLE_BAR_HEIGHT: i32 = 36;

/// Offset applied per already-open window when placing a new one.
pub const CASCADE_STEP: i32 = 30;
pub const CASCADE_ORIGIN: (i32, i32) = (150, 100);

/// Physical screen plus the space reserved for the shell bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenLayout {
    pub width: i32,
    pub height: i32,
    pub bar_height: i32,
    pub bar_position: BarPosition,
}

impl Default for ScreenLayout {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            bar_height: 48,
            bar_position: BarPosition::Top,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapZone {
    Left,
    Right,
    Maximize,
}

/// Target a drag would commit to if released now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapProposal {
    pub zone: SnapZone,
    pub rect: Rect,
}

impl ScreenLayout {
    /// Screen area not covered by the bar.
    pub fn work_area(&self) -> Rect {
        let usable = (self.height - self.bar_height).max(0);
        match self.bar_position {
            BarPosition::Top => Rect::new(0, self.bar_height, self.width, usable),
            BarPosition::Bottom => Rect::new(0, 0, self.width, usable),
        }
    }

    /// Geometry a maximized window occupies.
    pub fn maximized_rect(&self) -> Rect {
        self.work_area()
    }

    pub fn zone_rect(&self, zone: SnapZone) -> Rect {
        let area = self.work_area();
        let half = area.width / 2;
        match zone {
            SnapZone::Left => Rect::new(area.x, area.y, half, area.height),
            SnapZone::Right => Rect::new(area.x + half, area.y, area.width - half, area.height),
            SnapZone::Maximize => area,
        }
    }

    /// Checks edges in order left, right, top; first match wins.
    pub fn snap_zone(&self, window: Rect) -> Option<SnapZone> {
        if window.x <= SNAP_THRESHOLD {
            Some(SnapZone::Left)
        } else if window.right() >= self.width - SNAP_THRESHOLD {
            Some(SnapZone::Right)
        } else if window.y <= SNAP_THRESHOLD {
            Some(SnapZone::Maximize)
        } else {
            None
        }
    }

    pub fn snap_proposal(&self, window: Rect) -> Option<SnapProposal> {
        self.snap_zone(window).map(|zone| SnapProposal {
            zone,
            rect: self.zone_rect(zone),
        })
    }

    /// Default position for a new window given how many are already open.
    pub fn cascade_origin(&self, open_windows: usize) -> (i32, i32) {
        let step = CASCADE_STEP.saturating_mul(open_windows as i32);
        (CASCADE_ORIGIN.0 + step, CASCADE_ORIGIN.1 + step)
    }
}

/// Enforces the minimum window size.
pub fn clamp_size(width: i32, height: i32) -> (i32, i32) {
    (width.max(MIN_WINDOW_WIDTH), height.max(MIN_WINDOW_HEIGHT))
}

/// Area inside a window frame where content (or an external surface) is drawn.
pub fn content_rect(frame: Rect) -> Rect {
    Rect::new(
        frame.x,
        frame.y + TITLE_BAR_HEIGHT,
        frame.width,
        (frame.height - TITLE_BAR_HEIGHT).max(0),
    )
}

/// Which frame edges a resize handle moves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeEdges {
    pub north: bool,
    pub south: bool,
    pub east: bool,
    pub west: bool,
}

impl ResizeEdges {
    /// Parses handle names like `e`, `s`, `nw`, `se`.
    pub fn parse(handle: &str) -> Option<Self> {
        let mut edges = ResizeEdges::default();
        for c in handle.trim().chars() {
            match c.to_ascii_lowercase() {
                'n' => edges.north = true,
                's' => edges.south = true,
                'e' => edges.east = true,
                'w' => edges.west = true,
                _ => return None,
            }
        }
        if (edges.north && edges.south) || (edges.east && edges.west) || edges == Self::default()
        {
            return None;
        }
        Some(edges)
    }

    /// Applies a pointer delta to the starting frame.
    ///
    /// Moving a west or north edge shifts the origin so the opposite edge stays
    /// put; once the minimum size is hit the origin stops moving too.
    pub fn apply(&self, start: Rect, dx: i32, dy: i32) -> Rect {
        let mut rect = start;

        if self.east {
            rect.width = (start.width + dx).max(MIN_WINDOW_WIDTH);
        }
        if self.west {
            rect.width = (start.width - dx).max(MIN_WINDOW_WIDTH);
            rect.x = start.x + (start.width - rect.width);
        }
        if self.south {
            rect.height = (start.height + dy).max(MIN_WINDOW_HEIGHT);
        }
        if self.north {
            rect.height = (start.height - dy).max(MIN_WINDOW_HEIGHT);
            rect.y = start.y + (start.height - rect.height);
        }

        rect
    }
}
