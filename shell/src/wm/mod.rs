//! Window manager model.
//!
//! Everything in here is synchronous and owned by a single writer
//! (`DesktopActor`). Views read snapshots or subscribe to [`DesktopEvent`]s.
//!
//! [`DesktopEvent`]: shared_types::DesktopEvent

pub mod geometry;
pub mod interaction;
pub mod registry;
pub mod switcher;
pub mod tap;
pub mod toasts;
pub mod views;

use serde::{Deserialize, Serialize};

pub use geometry::{ResizeEdges, ScreenLayout, SnapProposal, SnapZone};
pub use interaction::{DragFrame, InputSource, Point, ResizeFrame};
pub use registry::{TaskbarAction, WindowManager};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DesktopError {
    #[error("App not found: {0}")]
    AppNotFound(String),

    #[error("App is disabled: {0}")]
    AppDisabled(String),

    #[error("External app has no exec command: {0}")]
    MissingExec(String),

    #[error("Failed to launch {command}: {reason}")]
    LaunchFailed { command: String, reason: String },

    #[error("Window not found: {0}")]
    WindowNotFound(String),

    #[error("Window {0} is not a terminal")]
    NotATerminal(String),

    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

// ============================================================================
// Keyboard
// ============================================================================

/// Keys the window manager reacts to. Everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Alt,
    Tab,
    Super,
    #[serde(other)]
    Other,
}

/// Follow-up work a key press asks the caller to schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Handled,
    /// Call [`WindowManager::single_tap_due`] with `generation` after `delay`.
    SingleTapPending {
        generation: u64,
        delay: std::time::Duration,
    },
}
