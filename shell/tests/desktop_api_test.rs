//! Desktop API Integration Tests
//!
//! Tests full HTTP request/response cycles against a detached desktop

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use shell::actors::desktop::DesktopArguments;
use shell::api;
use shell::app_state::AppState;
use shell::backend::compositor::RecordingCompositor;
use shell::backend::DetachedBackend;
use shell::config::built_in_app_catalog;
use shell::wm::ScreenLayout;

async fn setup_test_app() -> axum::Router {
    let mut args = DesktopArguments::new(
        ScreenLayout::default(),
        built_in_app_catalog(),
        Arc::new(DetachedBackend::new()),
        Arc::new(RecordingCompositor::default()),
    );
    args.config_poll = None;
    args.stats_poll = None;

    let app_state = AppState::start(args)
        .await
        .expect("Failed to start desktop actor");
    let api_state = api::ApiState {
        app_state: Arc::new(app_state),
    };
    api::router().with_state(api_state)
}

async fn json_response(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.expect("Request failed");
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let value: Value = serde_json::from_slice(&body).expect("Invalid JSON response");
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn send(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn open(app: &axum::Router, app_id: &str) -> Value {
    let (status, body) = json_response(
        app,
        send("POST", "/desktop/windows", json!({ "app_id": app_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "open {app_id}: {body}");
    body["window"].clone()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup_test_app().await;

    let (status, body) = json_response(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "blue-shell");
    assert_eq!(body["backend"], "detached");
}

#[tokio::test]
async fn test_open_cascades_and_focuses() {
    let app = setup_test_app().await;

    let terminal = open(&app, "terminal").await;
    assert_eq!(terminal["x"], 150);
    assert_eq!(terminal["y"], 100);
    assert_eq!(terminal["width"], 800);
    assert_eq!(terminal["height"], 600);
    assert_eq!(terminal["z_index"], 10);

    let files = open(&app, "explorer").await;
    assert_eq!(files["x"], 180);
    assert_eq!(files["y"], 130);
    assert_eq!(files["z_index"], 11);

    let (_, body) = json_response(&app, get("/desktop")).await;
    assert_eq!(body["desktop"]["active_window"], files["id"]);

    let (_, body) = json_response(&app, get("/desktop/windows")).await;
    let windows = body["windows"].as_array().unwrap();
    assert_eq!(windows.len(), 2);
    // Back to front
    assert_eq!(windows[0]["id"], terminal["id"]);
    assert_eq!(windows[1]["id"], files["id"]);
}

#[tokio::test]
async fn test_open_unknown_app_fails() {
    let app = setup_test_app().await;

    let (status, body) = json_response(
        &app,
        send("POST", "/desktop/windows", json!({ "app_id": "does_not_exist" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("does_not_exist"));

    let (_, body) = json_response(&app, get("/desktop/windows")).await;
    assert!(body["windows"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_operations_on_missing_window_are_noops() {
    let app = setup_test_app().await;

    let (status, body) = json_response(&app, empty("DELETE", "/desktop/windows/ghost-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["changed"], false);

    for action in ["focus", "minimize", "maximize", "toggle"] {
        let (status, body) = json_response(
            &app,
            empty("POST", &format!("/desktop/windows/ghost-1/{action}")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], false, "{action}");
    }

    let (status, body) = json_response(
        &app,
        send("PATCH", "/desktop/windows/ghost-1/position", json!({ "x": 1, "y": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], false);
}

#[tokio::test]
async fn test_minimize_then_restore_from_taskbar() {
    let app = setup_test_app().await;
    let window = open(&app, "settings").await;
    let id = window["id"].as_str().unwrap();

    let (_, body) = json_response(&app, empty("POST", &format!("/desktop/windows/{id}/minimize"))).await;
    assert_eq!(body["changed"], true);

    let (_, body) = json_response(&app, get("/desktop")).await;
    assert!(body["desktop"]["active_window"].is_null());
    assert_eq!(body["desktop"]["windows"][0]["minimized"], true);

    let (_, body) = json_response(&app, empty("POST", &format!("/desktop/windows/{id}/toggle"))).await;
    assert_eq!(body["action"], "restored");

    let (_, body) = json_response(&app, get("/desktop")).await;
    assert_eq!(body["desktop"]["active_window"], id);
    let restored = &body["desktop"]["windows"][0];
    assert_eq!(restored["minimized"], false);
    assert!(restored["z_index"].as_u64().unwrap() > window["z_index"].as_u64().unwrap());

    // Active window click minimizes
    let (_, body) = json_response(&app, empty("POST", &format!("/desktop/windows/{id}/toggle"))).await;
    assert_eq!(body["action"], "minimized");
}

#[tokio::test]
async fn test_close_active_leaves_nothing_active() {
    let app = setup_test_app().await;
    let first = open(&app, "terminal").await;
    let second = open(&app, "about").await;

    let uri = format!("/desktop/windows/{}", second["id"].as_str().unwrap());
    let (_, body) = json_response(&app, empty("DELETE", &uri)).await;
    assert_eq!(body["changed"], true);

    let (_, body) = json_response(&app, get("/desktop")).await;
    assert!(body["desktop"]["active_window"].is_null());
    assert_eq!(body["desktop"]["windows"][0]["id"], first["id"]);

    // Second close of the same id changes nothing
    let (_, body) = json_response(&app, empty("DELETE", &uri)).await;
    assert_eq!(body["changed"], false);
}

#[tokio::test]
async fn test_resize_is_clamped() {
    let app = setup_test_app().await;
    let window = open(&app, "calculator").await;
    let id = window["id"].as_str().unwrap();

    let (status, body) = json_response(
        &app,
        send(
            "PATCH",
            &format!("/desktop/windows/{id}/size"),
            json!({ "width": 120, "height": 900 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["width"], 300);
    assert_eq!(body["height"], 900);
}

#[tokio::test]
async fn test_maximize_toggles() {
    let app = setup_test_app().await;
    let window = open(&app, "blue_web").await;
    let id = window["id"].as_str().unwrap();

    let (_, body) = json_response(&app, empty("POST", &format!("/desktop/windows/{id}/maximize"))).await;
    assert_eq!(body["maximized"], true);
    let (_, body) = json_response(&app, empty("POST", &format!("/desktop/windows/{id}/maximize"))).await;
    assert_eq!(body["maximized"], false);
}

#[tokio::test]
async fn test_switch_desktop_isolates_windows() {
    let app = setup_test_app().await;
    open(&app, "terminal").await;

    let (_, body) = json_response(&app, empty("POST", "/desktop/switch/1")).await;
    assert_eq!(body["changed"], true);
    assert_eq!(body["current_desktop"], 1);

    let (_, body) = json_response(&app, get("/desktop/taskbar")).await;
    let entries = body["taskbar"].as_array().unwrap();
    assert!(entries.iter().all(|e| e["open"] == false));

    // Switching to the current desktop is a no-op
    let (_, body) = json_response(&app, empty("POST", "/desktop/switch/1")).await;
    assert_eq!(body["changed"], false);
}

#[tokio::test]
async fn test_taskbar_lists_pinned_then_running() {
    let app = setup_test_app().await;
    let calc = open(&app, "calculator").await;

    let (status, body) = json_response(&app, get("/desktop/taskbar")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["taskbar"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["app_id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec!["terminal", "explorer", "blue_software", "settings", "calculator"]
    );
    let last = &body["taskbar"][4];
    assert_eq!(last["pinned"], false);
    assert_eq!(last["active"], true);
    assert_eq!(last["window_id"], calc["id"]);
}

#[tokio::test]
async fn test_register_app_then_open() {
    let app = setup_test_app().await;

    let (status, _) = json_response(
        &app,
        send(
            "POST",
            "/desktop/apps",
            json!({ "id": "notes", "name": "Notes", "default_width": 200, "default_height": 100 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = json_response(&app, get("/desktop/apps")).await;
    assert!(body["apps"]
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a["id"] == "notes"));

    let window = open(&app, "notes").await;
    // Declared size below the minimum is clamped
    assert_eq!(window["width"], 300);
    assert_eq!(window["height"], 200);
    assert_eq!(window["title"], "Notes");

    let (status, _) = json_response(
        &app,
        send("POST", "/desktop/apps", json!({ "id": " ", "name": "Blank" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_external_launch_is_tracked() {
    let app = setup_test_app().await;

    let (status, body) = json_response(
        &app,
        send(
            "POST",
            "/desktop/windows",
            json!({ "app_id": "vlc", "external": true, "exec": "vlc", "title": "VLC" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let window = &body["window"];
    assert_eq!(window["external"], true);
    assert_eq!(window["width"], 0);
    assert_eq!(window["z_index"], 0);

    let (_, body) = json_response(&app, get("/desktop")).await;
    assert!(body["desktop"]["active_window"].is_null());

    let (status, _) = json_response(
        &app,
        send(
            "POST",
            "/desktop/windows",
            json!({ "app_id": "mystery", "external": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_overlays_toggle_exclusively() {
    let app = setup_test_app().await;

    let (_, body) = json_response(&app, empty("POST", "/desktop/overlays/start_menu")).await;
    assert_eq!(body["overlays"]["start_menu"], true);

    let (_, body) = json_response(&app, empty("POST", "/desktop/overlays/control_center")).await;
    assert_eq!(body["overlays"]["start_menu"], false);
    assert_eq!(body["overlays"]["control_center"], true);

    let (_, body) = json_response(&app, empty("POST", "/desktop/overlays/dismiss")).await;
    assert_eq!(body["overlays"]["control_center"], false);

    let (status, body) = json_response(&app, empty("POST", "/desktop/overlays/dock")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_toasts_push_and_dismiss() {
    let app = setup_test_app().await;

    let (status, body) = json_response(
        &app,
        send(
            "POST",
            "/desktop/toasts",
            json!({ "level": "success", "title": "Saved", "message": "Wallpaper updated" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let toast_id = body["toast"]["id"].as_str().unwrap().to_string();

    let (_, body) = json_response(&app, get("/desktop")).await;
    assert_eq!(body["desktop"]["toasts"][0]["title"], "Saved");

    let (_, body) = json_response(&app, empty("DELETE", &format!("/desktop/toasts/{toast_id}"))).await;
    assert_eq!(body["changed"], true);
    let (_, body) = json_response(&app, empty("DELETE", &format!("/desktop/toasts/{toast_id}"))).await;
    assert_eq!(body["changed"], false);
}

#[tokio::test]
async fn test_config_round_trip_and_disabled_apps() {
    let app = setup_test_app().await;

    let (_, body) = json_response(&app, get("/system/config")).await;
    let mut config = body["config"].clone();
    assert_eq!(config["theme_name"], "blue-default");

    config["theme_name"] = json!("dracula");
    config["disabled_apps"] = json!(["about"]);
    let (status, body) = json_response(&app, send("PUT", "/system/config", config)).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, body) = json_response(&app, get("/system/config")).await;
    assert_eq!(body["config"]["theme_name"], "dracula");

    let (status, _) = json_response(
        &app,
        send("POST", "/desktop/windows", json!({ "app_id": "about" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_system_routes_degrade_when_detached() {
    let app = setup_test_app().await;

    let (status, body) = json_response(&app, get("/system/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["wifi_ssid"], "Disconnected");

    let (status, body) = json_response(&app, get("/system/files?path=HOME")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["entries"].as_array().unwrap().is_empty());

    let (status, body) = json_response(&app, get("/system/apps")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["apps"].as_array().unwrap().is_empty());

    let (status, body) = json_response(&app, send("POST", "/system/volume", json!({ "level": 180 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["level"], 100);

    let (status, _) = json_response(&app, send("POST", "/system/wifi", json!({ "enabled": false }))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_terminal_info_rejects_non_terminal_windows() {
    let app = setup_test_app().await;
    let window = open(&app, "explorer").await;

    let (status, body) = json_response(
        &app,
        get(&format!("/terminal/{}", window["id"].as_str().unwrap())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}
