//! System endpoints: stats, user config, files, installed apps, and the
//! volume/wifi quick toggles.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use shared_types::UserConfig;

use crate::actors::desktop::DesktopActorMsg;
use crate::api::ApiState;
use crate::backend::BackendError;

#[derive(Debug, Deserialize)]
pub struct FilesQuery {
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_path() -> String {
    "HOME".to_string()
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    pub level: u8,
}

#[derive(Debug, Deserialize)]
pub struct WifiRequest {
    pub enabled: bool,
}

fn backend_error(e: BackendError) -> Response {
    let status = match e {
        BackendError::EmptyCommand => StatusCode::BAD_REQUEST,
        BackendError::Io(_) | BackendError::Parse(_) | BackendError::Launch { .. } => {
            StatusCode::BAD_GATEWAY
        }
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

pub async fn get_stats(State(state): State<ApiState>) -> Response {
    match state.app_state.backend().system_stats().await {
        Ok(stats) => (StatusCode::OK, Json(json!({ "success": true, "stats": stats }))).into_response(),
        Err(e) => backend_error(e),
    }
}

/// Config as currently applied by the desktop
pub async fn get_config(State(state): State<ApiState>) -> Response {
    let desktop = state.app_state.desktop();
    match ractor::call!(desktop, |reply| DesktopActorMsg::GetConfig { reply }) {
        Ok(config) => (
            StatusCode::OK,
            Json(json!({ "success": true, "config": config })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": format!("Actor error: {e}") })),
        )
            .into_response(),
    }
}

/// Persist and apply a new config
pub async fn save_config(
    State(state): State<ApiState>,
    Json(config): Json<UserConfig>,
) -> Response {
    let desktop = state.app_state.desktop();
    match ractor::call!(desktop, |reply| DesktopActorMsg::SaveConfig { config, reply }) {
        Ok(Ok(())) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Ok(Err(e)) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "success": false, "error": e.to_string() })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": format!("Actor error: {e}") })),
        )
            .into_response(),
    }
}

pub async fn list_files(
    State(state): State<ApiState>,
    Query(query): Query<FilesQuery>,
) -> Response {
    match state.app_state.backend().list_dir(&query.path).await {
        Ok(entries) => (
            StatusCode::OK,
            Json(json!({ "success": true, "path": query.path, "entries": entries })),
        )
            .into_response(),
        Err(e) => backend_error(e),
    }
}

pub async fn installed_apps(State(state): State<ApiState>) -> Response {
    match state.app_state.backend().installed_apps().await {
        Ok(apps) => (StatusCode::OK, Json(json!({ "success": true, "apps": apps }))).into_response(),
        Err(e) => backend_error(e),
    }
}

pub async fn set_volume(
    State(state): State<ApiState>,
    Json(req): Json<VolumeRequest>,
) -> Response {
    let level = req.level.min(100);
    match state.app_state.backend().set_volume(level).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true, "level": level }))).into_response(),
        Err(e) => backend_error(e),
    }
}

pub async fn set_wifi(State(state): State<ApiState>, Json(req): Json<WifiRequest>) -> Response {
    match state.app_state.backend().set_wifi(req.enabled).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "success": true, "enabled": req.enabled })),
        )
            .into_response(),
        Err(e) => backend_error(e),
    }
}
