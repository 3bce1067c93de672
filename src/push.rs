//! Push Bridge
//!
//! Turns push payloads into notifications and decides what a notification
//! click does. Nothing here touches the cache.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;

/// Inbound push payload. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub url: Option<String>,
}

/// A notification ready to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    /// Page opened or focused on click
    pub url: String,
}

impl Notification {
    /// Builds a notification from raw payload bytes.
    ///
    /// A payload that is not a JSON object is shown as plain text under the
    /// default title.
    pub fn from_payload(payload: &[u8], config: &Config) -> Self {
        let parsed = match serde_json::from_slice::<PushPayload>(payload) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "push payload is not JSON, showing as text");
                PushPayload {
                    body: Some(String::from_utf8_lossy(payload).into_owned()),
                    ..PushPayload::default()
                }
            }
        };

        Self {
            title: parsed
                .title
                .unwrap_or_else(|| config.push_default_title.clone()),
            body: parsed.body.unwrap_or_default(),
            icon: parsed.icon,
            badge: parsed.badge.or_else(|| default_badge(config)),
            url: parsed.url.unwrap_or_else(|| "/".to_string()),
        }
    }
}

fn default_badge(config: &Config) -> Option<String> {
    config
        .precache_assets
        .iter()
        .find(|asset| asset.starts_with("/icons/"))
        .cloned()
}

// == Click Routing ==
/// An open window the click may focus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowClient {
    pub id: String,
    pub url: String,
}

/// What to do with a notification click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClickAction {
    Focus { window_id: String },
    Open { url: String },
}

/// Focuses the first window showing `target` (or `target#fragment`), else
/// opens `target` in a new window.
pub fn route_click(target: Option<&str>, windows: &[WindowClient], config: &Config) -> ClickAction {
    let target = target.unwrap_or("/");
    let target = config
        .resolve(target)
        .map(|url| url.to_string())
        .unwrap_or_else(|| target.to_string());
    let with_fragment = format!("{}#", target);

    match windows
        .iter()
        .find(|w| w.url == target || w.url.starts_with(&with_fragment))
    {
        Some(window) => ClickAction::Focus {
            window_id: window.id.clone(),
        },
        None => ClickAction::Open { url: target },
    }
}
