//! Capabilities the shell consumes from the host system.
//!
//! The window manager never talks to the OS directly. It goes through
//! [`SystemBackend`] for processes, stats, configuration and files, and
//! through [`compositor::CompositorBridge`] for surface rectangles. Both have
//! a detached implementation so the shell runs unchanged without a host.

pub mod compositor;
pub mod detached;
pub mod native;

use async_trait::async_trait;
use shared_types::{AppDefinition, FileEntry, SystemStats, UserConfig};

pub use detached::DetachedBackend;
pub use native::NativeBackend;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Failed to launch {command}: {reason}")]
    Launch { command: String, reason: String },

    #[error("IO error: {0}")]
    Io(String),

    #[error("Invalid data: {0}")]
    Parse(String),
}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        BackendError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        BackendError::Parse(e.to_string())
    }
}

// ============================================================================
// Capability interface
// ============================================================================

#[async_trait]
pub trait SystemBackend: Send + Sync + 'static {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Starts a process and returns without waiting for it.
    async fn launch_process(&self, command: &str) -> Result<(), BackendError>;

    async fn system_stats(&self) -> Result<SystemStats, BackendError>;

    async fn load_config(&self) -> Result<UserConfig, BackendError>;

    async fn save_config(&self, config: &UserConfig) -> Result<(), BackendError>;

    async fn list_dir(&self, path: &str) -> Result<Vec<FileEntry>, BackendError>;

    /// Installed desktop applications, as external app definitions.
    async fn installed_apps(&self) -> Result<Vec<AppDefinition>, BackendError>;

    async fn set_volume(&self, level: u8) -> Result<(), BackendError> {
        self.launch_process(&format!("amixer set Master {}%", level.min(100)))
            .await
    }

    async fn set_wifi(&self, enabled: bool) -> Result<(), BackendError> {
        let state = if enabled { "on" } else { "off" };
        self.launch_process(&format!("nmcli radio wifi {state}")).await
    }
}

/// Splits a command line on whitespace into program and arguments.
pub fn split_command(command: &str) -> Result<(&str, Vec<&str>), BackendError> {
    let mut parts = command.split_whitespace();
    let program = parts.next().ok_or(BackendError::EmptyCommand)?;
    Ok((program, parts.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command() {
        let (program, args) = split_command("  gimp   --new-instance file.png ").unwrap();
        assert_eq!(program, "gimp");
        assert_eq!(args, vec!["--new-instance", "file.png"]);
        assert_eq!(split_command("   "), Err(BackendError::EmptyCommand));
    }
}
