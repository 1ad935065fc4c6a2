//! Backend used when no host session is attached (preview, tests, CI).
//!
//! Calls log at debug level and answer with defaults. Nothing here is an
//! error: running without a host is an expected environment.

use std::sync::Mutex;

use async_trait::async_trait;
use shared_types::{AppDefinition, FileEntry, SystemStats, UserConfig};

use super::{split_command, BackendError, SystemBackend};

#[derive(Debug, Default)]
pub struct DetachedBackend {
    /// Last saved config, so a save/load pair behaves within one process
    config: Mutex<Option<UserConfig>>,
}

impl DetachedBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SystemBackend for DetachedBackend {
    fn name(&self) -> &'static str {
        "detached"
    }

    async fn launch_process(&self, command: &str) -> Result<(), BackendError> {
        split_command(command)?;
        tracing::debug!(command = %command, "launch_process ignored (detached backend)");
        Ok(())
    }

    async fn system_stats(&self) -> Result<SystemStats, BackendError> {
        Ok(SystemStats::default())
    }

    async fn load_config(&self) -> Result<UserConfig, BackendError> {
        let saved = self.config.lock().ok().and_then(|c| c.clone());
        Ok(saved.unwrap_or_default())
    }

    async fn save_config(&self, config: &UserConfig) -> Result<(), BackendError> {
        tracing::debug!("save_config kept in memory (detached backend)");
        if let Ok(mut slot) = self.config.lock() {
            *slot = Some(config.clone());
        }
        Ok(())
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<FileEntry>, BackendError> {
        tracing::debug!(path = %path, "list_dir ignored (detached backend)");
        Ok(Vec::new())
    }

    async fn installed_apps(&self) -> Result<Vec<AppDefinition>, BackendError> {
        Ok(Vec::new())
    }
}
