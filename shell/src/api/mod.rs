//! HTTP API routes for the shell
//!
//! Every route talks to the desktop actor or the system backend held in
//! [`AppState`]. Desktop changes are pushed over `/ws`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;

pub mod desktop;
pub mod system;
pub mod terminal;
pub mod websocket;

use crate::app_state::AppState;

#[derive(Clone)]
pub struct ApiState {
    pub app_state: Arc<AppState>,
}

/// Configure all API routes
pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::ws_handler))
        // Desktop routes
        .route("/desktop", get(desktop::get_desktop_state))
        .route(
            "/desktop/windows",
            get(desktop::get_windows).post(desktop::open_window),
        )
        .route("/desktop/windows/{window_id}", delete(desktop::close_window))
        .route(
            "/desktop/windows/{window_id}/focus",
            post(desktop::focus_window),
        )
        .route(
            "/desktop/windows/{window_id}/minimize",
            post(desktop::minimize_window),
        )
        .route(
            "/desktop/windows/{window_id}/maximize",
            post(desktop::maximize_window),
        )
        .route(
            "/desktop/windows/{window_id}/toggle",
            post(desktop::toggle_window),
        )
        .route(
            "/desktop/windows/{window_id}/position",
            patch(desktop::move_window),
        )
        .route(
            "/desktop/windows/{window_id}/size",
            patch(desktop::resize_window),
        )
        .route("/desktop/switch/{desktop_id}", post(desktop::switch_desktop))
        .route(
            "/desktop/apps",
            get(desktop::get_apps).post(desktop::register_app),
        )
        .route("/desktop/taskbar", get(desktop::get_taskbar))
        .route("/desktop/overlays/{overlay}", post(desktop::toggle_overlay))
        .route("/desktop/toasts", post(desktop::push_toast))
        .route("/desktop/toasts/{toast_id}", delete(desktop::dismiss_toast))
        // System routes
        .route("/system/stats", get(system::get_stats))
        .route(
            "/system/config",
            get(system::get_config).put(system::save_config),
        )
        .route("/system/files", get(system::list_files))
        .route("/system/apps", get(system::installed_apps))
        .route("/system/volume", post(system::set_volume))
        .route("/system/wifi", post(system::set_wifi))
        // Terminal routes
        .route("/terminal/{window_id}", get(terminal::get_terminal_info))
        .route("/ws/terminal/{window_id}", get(terminal::terminal_websocket))
}

async fn health_check(State(state): State<ApiState>) -> impl IntoResponse {
    let backend = state.app_state.backend();
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "blue-shell",
            "backend": backend.name(),
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
