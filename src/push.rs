//! Push notifications delivered to the client.
//!
//! A push event carries a JSON payload that is shown as a system
//! notification; clicking it focuses a context already showing the target
//! url or opens a new one.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_TITLE: &str = "Hoard Valley";
pub const DEFAULT_BODY: &str = "You have a new notification";
pub const DEFAULT_ICON: &str = "/icon-192.png";
pub const DEFAULT_BADGE: &str = "/badge-72.png";
pub const DEFAULT_URL: &str = "/";

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_body() -> String {
    DEFAULT_BODY.to_string()
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushData {
    #[serde(default = "default_url")]
    pub url: String,
}

impl Default for PushData {
    fn default() -> Self {
        Self { url: default_url() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_body")]
    pub body: String,
    pub icon: Option<String>,
    pub badge: Option<String>,
    #[serde(default)]
    pub data: PushData,
}

impl Default for PushPayload {
    fn default() -> Self {
        Self {
            title: default_title(),
            body: default_body(),
            icon: None,
            badge: None,
            data: PushData::default(),
        }
    }
}

impl PushPayload {
    /// Parse an event body. An empty or malformed body still yields a
    /// notification with the defaults so the push is never dropped silently.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        match serde_json::from_str::<Self>(raw) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Malformed push payload, using defaults: {e}");
                Self::default()
            }
        }
    }
}

/// What gets handed to the platform for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub url: String,
}

impl From<PushPayload> for Notification {
    fn from(p: PushPayload) -> Self {
        Self {
            title: p.title,
            body: p.body,
            icon: p.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
            badge: p.badge.unwrap_or_else(|| DEFAULT_BADGE.to_string()),
            url: p.data.url,
        }
    }
}

/// An open client context (tab or window).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenContext {
    pub id: u32,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    Focus(u32),
    Open(String),
}

/// Decide what a click on `notification` does given the open contexts.
/// Urls compare equal when either side carries an origin the other lacks.
pub fn resolve_click(notification: &Notification, open: &[OpenContext]) -> ClickAction {
    let target = notification.url.as_str();
    match open.iter().find(|c| same_location(&c.url, target)) {
        Some(ctx) => {
            debug!(context = ctx.id, url = target, "Focusing open context");
            ClickAction::Focus(ctx.id)
        }
        None => ClickAction::Open(target.to_string()),
    }
}

fn same_location(open_url: &str, target: &str) -> bool {
    open_url == target || path_of(open_url) == path_of(target)
}

fn path_of(url: &str) -> &str {
    match url.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => url,
    }
}
