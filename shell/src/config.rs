//! Process configuration: environment variables and the app catalog.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use shared_types::{AppDefinition, BarPosition};

use crate::wm::ScreenLayout;

const BUILTIN_APP_CATALOG_TOML: &str = include_str!("../config/apps.toml");

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone)]
pub struct ShellConfig {
    pub bind_addr: SocketAddr,
    pub layout: ScreenLayout,
    /// Unix socket of the compositor; `None` runs detached
    pub compositor_socket: Option<PathBuf>,
    /// `None` selects the detached backend
    pub config_dir: Option<PathBuf>,
    pub home_dir: PathBuf,
    pub terminal_shell: String,
    pub app_catalog: Option<PathBuf>,
}

impl ShellConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bind_addr = get("SHELL_BIND_ADDR")
            .and_then(|raw| match raw.parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    tracing::warn!(value = %raw, error = %e, "Invalid SHELL_BIND_ADDR; using default");
                    None
                }
            })
            .unwrap_or_else(|| {
                DEFAULT_BIND_ADDR
                    .parse()
                    .unwrap_or(SocketAddr::from(([127, 0, 0, 1], 8080)))
            });

        let defaults = ScreenLayout::default();
        let number = |key: &str, fallback: i32| -> i32 {
            get(key)
                .and_then(|raw| raw.trim().parse::<i32>().ok())
                .filter(|value| *value > 0)
                .unwrap_or(fallback)
        };
        let layout = ScreenLayout {
            width: number("SHELL_SCREEN_WIDTH", defaults.width),
            height: number("SHELL_SCREEN_HEIGHT", defaults.height),
            bar_height: number("SHELL_BAR_HEIGHT", defaults.bar_height),
            bar_position: BarPosition::Top,
        };

        let home_dir = get("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("/"));
        let detached = get("SHELL_DETACHED").is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
        let config_dir = if detached {
            None
        } else {
            Some(
                get("SHELL_CONFIG_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| home_dir.join(".config").join("blue-environment")),
            )
        };

        let terminal_shell = get("SHELL_TERMINAL")
            .or_else(|| get("SHELL"))
            .unwrap_or_else(|| "/bin/sh".to_string());

        Self {
            bind_addr,
            layout,
            compositor_socket: get("SHELL_COMPOSITOR_SOCKET").map(PathBuf::from),
            config_dir,
            home_dir,
            terminal_shell,
            app_catalog: get("SHELL_APP_CATALOG").map(PathBuf::from),
        }
    }
}

// ============================================================================
// App catalog
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppCatalog {
    #[serde(default)]
    pub apps: Vec<AppDefinition>,
}

/// Loads the catalog at `path`, or the built-in one. Errors fall back to the
/// built-in catalog.
pub fn load_app_catalog(path: Option<&Path>) -> Vec<AppDefinition> {
    let Some(path) = path else {
        return built_in_app_catalog();
    };

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "Failed to read app catalog; using built-in catalog"
            );
            return built_in_app_catalog();
        }
    };

    match toml::from_str::<AppCatalog>(&content) {
        Ok(catalog) => catalog.apps,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "Failed to parse app catalog TOML; using built-in catalog"
            );
            built_in_app_catalog()
        }
    }
}

pub fn built_in_app_catalog() -> Vec<AppDefinition> {
    toml::from_str::<AppCatalog>(BUILTIN_APP_CATALOG_TOML)
        .map(|catalog| catalog.apps)
        .unwrap_or_else(|err| {
            tracing::error!(error = %err, "Failed to parse built-in app catalog");
            Vec::new()
        })
}
