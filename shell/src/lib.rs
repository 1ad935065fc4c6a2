//! Blue shell - window manager core with an actor-backed HTTP/WebSocket API
//!
//! The `wm` module is the synchronous model (registry, z-order, snapping,
//! switcher). `actors` put a single writer in front of it, `surface` keeps
//! external app surfaces aligned with their frames, and `api` exposes
//! everything to the UI.

pub mod actors;
pub mod api;
pub mod app_state;
pub mod backend;
pub mod config;
pub mod surface;
pub mod wm;
