use std::sync::Arc;

use axum::http::{header, Method};
use shell::actors::desktop::DesktopArguments;
use shell::api;
use shell::app_state::AppState;
use shell::backend::compositor::{CompositorBridge, DetachedCompositor, SocketCompositor};
use shell::backend::{DetachedBackend, NativeBackend, SystemBackend};
use shell::config::{load_app_catalog, ShellConfig};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

fn load_env_file() {
    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            tracing::warn!(error = %e, "Could not determine current directory for .env lookup");
            return;
        }
    };

    let mut current = cwd.clone();
    loop {
        let candidate = current.join(".env");
        if candidate.exists() {
            match dotenvy::from_path(&candidate) {
                Ok(_) => {
                    tracing::info!(path = %candidate.display(), "Loaded environment from .env");
                }
                Err(e) => {
                    tracing::warn!(
                        path = %candidate.display(),
                        error = %e,
                        "Failed to load .env file"
                    );
                }
            }
            return;
        }

        if !current.pop() {
            break;
        }
    }

    tracing::info!(
        cwd = %cwd.display(),
        "No .env file found in current directory or ancestors; using process environment only"
    );
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    load_env_file();
    let config = ShellConfig::from_env();
    tracing::info!(
        bind_addr = %config.bind_addr,
        width = config.layout.width,
        height = config.layout.height,
        "Starting Blue shell"
    );

    let backend: Arc<dyn SystemBackend> = match &config.config_dir {
        Some(config_dir) => Arc::new(NativeBackend::new(config_dir, &config.home_dir)),
        None => {
            tracing::info!("Running detached: no host backend");
            Arc::new(DetachedBackend::new())
        }
    };

    let compositor: Arc<dyn CompositorBridge> = match &config.compositor_socket {
        Some(path) => {
            tracing::info!(path = %path.display(), "Reporting surfaces to compositor socket");
            Arc::new(SocketCompositor::spawn(path))
        }
        None => Arc::new(DetachedCompositor),
    };

    let apps = load_app_catalog(config.app_catalog.as_deref());
    let mut args = DesktopArguments::new(config.layout, apps, backend, compositor);
    args.terminal_shell = config.terminal_shell.clone();
    args.home_dir = config.home_dir.clone();

    let app_state = AppState::start(args)
        .await
        .map_err(std::io::Error::other)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    let api_state = api::ApiState {
        app_state: Arc::new(app_state),
    };
    let app = api::router().with_state(api_state).layer(cors);

    tracing::info!("Starting HTTP server on http://{}", config.bind_addr);
    let listener = TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await
}
