//! Request DTOs for the control API

use serde::Deserialize;

use crate::push::WindowClient;

/// Request body for POST /__agent/notification-click
#[derive(Debug, Clone, Deserialize)]
pub struct ClickRequest {
    /// Target carried by the clicked notification
    #[serde(default)]
    pub url: Option<String>,
    /// Windows currently open on the origin
    #[serde(default)]
    pub windows: Vec<WindowClient>,
}

impl ClickRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.windows.iter().any(|w| w.id.is_empty()) {
            return Some("Window id cannot be empty".to_string());
        }
        None
    }
}
