//! Desktop API endpoints
//!
//! Window operations on ids that are not in the registry are not errors:
//! they answer `200` with `"changed": false`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use shared_types::{AppDefinition, OverlayKind, ToastLevel};

use crate::actors::desktop::DesktopActorMsg;
use crate::api::ApiState;
use crate::wm::DesktopError;

/// Request to open a window
#[derive(Debug, Deserialize)]
pub struct OpenWindowRequest {
    pub app_id: String,
    pub title: Option<String>,
    pub props: Option<Value>,
    /// Launch outside the frame and only track it on the taskbar
    #[serde(default)]
    pub external: bool,
    /// Command override for external launches
    pub exec: Option<String>,
}

/// Request to move a window
#[derive(Debug, Deserialize)]
pub struct MoveWindowRequest {
    pub x: i32,
    pub y: i32,
}

/// Request to resize a window
#[derive(Debug, Deserialize)]
pub struct ResizeWindowRequest {
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Deserialize)]
pub struct PushToastRequest {
    pub level: ToastLevel,
    pub title: String,
    #[serde(default)]
    pub message: String,
}

fn actor_error(e: impl std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "error": format!("Actor error: {e}")
        })),
    )
        .into_response()
}

fn desktop_error(e: DesktopError) -> Response {
    let status = match e {
        DesktopError::AppNotFound(_) | DesktopError::WindowNotFound(_) => StatusCode::NOT_FOUND,
        DesktopError::AppDisabled(_) => StatusCode::FORBIDDEN,
        DesktopError::LaunchFailed { .. } | DesktopError::Backend(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(json!({
            "success": false,
            "error": e.to_string()
        })),
    )
        .into_response()
}

fn changed(changed: bool, extra: Value) -> Response {
    let mut body = json!({ "success": true, "changed": changed });
    if let (Some(body), Value::Object(extra)) = (body.as_object_mut(), extra) {
        body.extend(extra);
    }
    (StatusCode::OK, Json(body)).into_response()
}

/// Full desktop snapshot
pub async fn get_desktop_state(State(state): State<ApiState>) -> Response {
    let desktop = state.app_state.desktop();
    match ractor::call!(desktop, |reply| DesktopActorMsg::GetDesktopState { reply }) {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(json!({ "success": true, "desktop": snapshot })),
        )
            .into_response(),
        Err(e) => actor_error(e),
    }
}

/// Windows back to front
pub async fn get_windows(State(state): State<ApiState>) -> Response {
    let desktop = state.app_state.desktop();
    match ractor::call!(desktop, |reply| DesktopActorMsg::GetWindows { reply }) {
        Ok(windows) => (
            StatusCode::OK,
            Json(json!({ "success": true, "windows": windows })),
        )
            .into_response(),
        Err(e) => actor_error(e),
    }
}

/// Open a new window for an app
pub async fn open_window(
    State(state): State<ApiState>,
    Json(req): Json<OpenWindowRequest>,
) -> Response {
    let desktop = state.app_state.desktop();
    let result = if req.external {
        ractor::call!(desktop, |reply| DesktopActorMsg::LaunchExternal {
            app_id: req.app_id.clone(),
            command: req.exec.clone(),
            title: req.title.clone(),
            reply,
        })
    } else {
        ractor::call!(desktop, |reply| DesktopActorMsg::OpenWindow {
            app_id: req.app_id.clone(),
            title: req.title.clone(),
            props: req.props.clone(),
            reply,
        })
    };

    match result {
        Ok(Ok(window)) => (
            StatusCode::OK,
            Json(json!({ "success": true, "window": window })),
        )
            .into_response(),
        Ok(Err(e)) => desktop_error(e),
        Err(e) => actor_error(e),
    }
}

/// Close a window
pub async fn close_window(
    Path(window_id): Path<String>,
    State(state): State<ApiState>,
) -> Response {
    let desktop = state.app_state.desktop();
    match ractor::call!(desktop, |reply| DesktopActorMsg::CloseWindow { window_id, reply }) {
        Ok(closed) => changed(closed.is_some(), json!({})),
        Err(e) => actor_error(e),
    }
}

/// Focus a window (bring to front)
pub async fn focus_window(
    Path(window_id): Path<String>,
    State(state): State<ApiState>,
) -> Response {
    let desktop = state.app_state.desktop();
    match ractor::call!(desktop, |reply| DesktopActorMsg::FocusWindow { window_id, reply }) {
        Ok(z_index) => changed(z_index.is_some(), json!({ "z_index": z_index })),
        Err(e) => actor_error(e),
    }
}

pub async fn minimize_window(
    Path(window_id): Path<String>,
    State(state): State<ApiState>,
) -> Response {
    let desktop = state.app_state.desktop();
    match ractor::call!(desktop, |reply| DesktopActorMsg::MinimizeWindow { window_id, reply }) {
        Ok(done) => changed(done, json!({})),
        Err(e) => actor_error(e),
    }
}

/// Toggle maximized
pub async fn maximize_window(
    Path(window_id): Path<String>,
    State(state): State<ApiState>,
) -> Response {
    let desktop = state.app_state.desktop();
    match ractor::call!(desktop, |reply| DesktopActorMsg::MaximizeWindow { window_id, reply }) {
        Ok(maximized) => changed(maximized.is_some(), json!({ "maximized": maximized })),
        Err(e) => actor_error(e),
    }
}

/// Taskbar click: restore, minimize or focus
pub async fn toggle_window(
    Path(window_id): Path<String>,
    State(state): State<ApiState>,
) -> Response {
    let desktop = state.app_state.desktop();
    match ractor::call!(desktop, |reply| DesktopActorMsg::ToggleWindow { window_id, reply }) {
        Ok(action) => changed(action.is_some(), json!({ "action": action })),
        Err(e) => actor_error(e),
    }
}

/// Move a window
pub async fn move_window(
    Path(window_id): Path<String>,
    State(state): State<ApiState>,
    Json(req): Json<MoveWindowRequest>,
) -> Response {
    let desktop = state.app_state.desktop();
    match ractor::call!(desktop, |reply| DesktopActorMsg::MoveWindow {
        window_id,
        x: req.x,
        y: req.y,
        reply,
    }) {
        Ok(done) => changed(done, json!({})),
        Err(e) => actor_error(e),
    }
}

/// Resize a window. The answer carries the clamped size.
pub async fn resize_window(
    Path(window_id): Path<String>,
    State(state): State<ApiState>,
    Json(req): Json<ResizeWindowRequest>,
) -> Response {
    let desktop = state.app_state.desktop();
    match ractor::call!(desktop, |reply| DesktopActorMsg::ResizeWindow {
        window_id,
        width: req.width,
        height: req.height,
        reply,
    }) {
        Ok(Some((width, height))) => changed(true, json!({ "width": width, "height": height })),
        Ok(None) => changed(false, json!({})),
        Err(e) => actor_error(e),
    }
}

pub async fn switch_desktop(
    Path(desktop_id): Path<u32>,
    State(state): State<ApiState>,
) -> Response {
    let desktop = state.app_state.desktop();
    match ractor::call!(desktop, |reply| DesktopActorMsg::SwitchDesktop { desktop_id, reply }) {
        Ok(switched) => changed(switched, json!({ "current_desktop": desktop_id })),
        Err(e) => actor_error(e),
    }
}

/// Get all registered apps
pub async fn get_apps(State(state): State<ApiState>) -> Response {
    let desktop = state.app_state.desktop();
    match ractor::call!(desktop, |reply| DesktopActorMsg::GetApps { reply }) {
        Ok(apps) => (StatusCode::OK, Json(json!({ "success": true, "apps": apps }))).into_response(),
        Err(e) => actor_error(e),
    }
}

/// Register or replace an app
pub async fn register_app(
    State(state): State<ApiState>,
    Json(app): Json<AppDefinition>,
) -> Response {
    if app.id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "App id must not be empty" })),
        )
            .into_response();
    }
    let desktop = state.app_state.desktop();
    match ractor::call!(desktop, |reply| DesktopActorMsg::RegisterApp { app, reply }) {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(e) => actor_error(e),
    }
}

pub async fn get_taskbar(State(state): State<ApiState>) -> Response {
    let desktop = state.app_state.desktop();
    match ractor::call!(desktop, |reply| DesktopActorMsg::GetTaskbar { reply }) {
        Ok(entries) => (
            StatusCode::OK,
            Json(json!({ "success": true, "taskbar": entries })),
        )
            .into_response(),
        Err(e) => actor_error(e),
    }
}

/// Toggle an overlay by name, or `dismiss` to close them all
pub async fn toggle_overlay(
    Path(overlay): Path<String>,
    State(state): State<ApiState>,
) -> Response {
    let kind = if overlay == "dismiss" {
        None
    } else {
        match serde_json::from_value::<OverlayKind>(Value::String(overlay.clone())) {
            Ok(kind) => Some(kind),
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "success": false,
                        "error": format!("Unknown overlay: {overlay}")
                    })),
                )
                    .into_response();
            }
        }
    };

    let desktop = state.app_state.desktop();
    match ractor::call!(desktop, |reply| DesktopActorMsg::ToggleOverlay {
        overlay: kind,
        reply,
    }) {
        Ok(overlays) => (
            StatusCode::OK,
            Json(json!({ "success": true, "overlays": overlays })),
        )
            .into_response(),
        Err(e) => actor_error(e),
    }
}

pub async fn push_toast(
    State(state): State<ApiState>,
    Json(req): Json<PushToastRequest>,
) -> Response {
    let desktop = state.app_state.desktop();
    match ractor::call!(desktop, |reply| DesktopActorMsg::PushToast {
        level: req.level,
        title: req.title,
        message: req.message,
        reply,
    }) {
        Ok(toast) => (StatusCode::OK, Json(json!({ "success": true, "toast": toast }))).into_response(),
        Err(e) => actor_error(e),
    }
}

pub async fn dismiss_toast(
    Path(toast_id): Path<String>,
    State(state): State<ApiState>,
) -> Response {
    let desktop = state.app_state.desktop();
    match ractor::call!(desktop, |reply| DesktopActorMsg::DismissToast { toast_id, reply }) {
        Ok(done) => changed(done, json!({})),
        Err(e) => actor_error(e),
    }
}
