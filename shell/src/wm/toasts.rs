//! Notification toasts.

use std::time::Duration;

use chrono::Utc;
use shared_types::{Toast, ToastLevel};

/// How long a toast stays up before it is dismissed automatically.
pub const TOAST_LIFETIME: Duration = Duration::from_secs(5);

#[derive(Debug, Default, Clone)]
pub struct ToastCenter {
    toasts: Vec<Toast>,
}

impl ToastCenter {
    pub fn push(
        &mut self,
        level: ToastLevel,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Toast {
        let toast = Toast {
            id: ulid::Ulid::new().to_string(),
            level,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
        };
        self.toasts.push(toast.clone());
        toast
    }

    pub fn dismiss(&mut self, toast_id: &str) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.id != toast_id);
        self.toasts.len() != before
    }

    pub fn list(&self) -> &[Toast] {
        &self.toasts
    }
}
