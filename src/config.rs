use std::time::Duration;

use crate::error::{AppError, Result};

pub const API_URL: &str = "http://localhost:54321";

/// Path of the sign-in entry point unauthenticated actions are redirected to.
pub const AUTH_ENTRY_PATH: &str = "/auth";

/// Fraction of the container width a single carousel arrow press scrolls.
pub const CAROUSEL_SCROLL_FRACTION: f64 = 0.8;

/// Delay before the first carousel measurement after mount.
/// Resize events after that are measured immediately.
pub const CAROUSEL_MEASURE_DELAY_MS: u64 = 100;

/// Capacity of the status-change broadcast. Slow subscribers lag and resync.
pub const STATUS_CHANNEL_CAPACITY: usize = 256;

pub const DEFAULT_REVIEWS_PAGE_SIZE: u32 = 5;
pub const DEFAULT_BIDS_PAGE_SIZE: u32 = 10;

/// Upper bound on review text accepted client-side.
pub const MAX_REVIEW_CHARS: usize = 2000;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    /// Anonymous project key (HOARD_API_KEY). Sent on every call.
    pub api_key: String,
    /// User JWT (HOARD_ACCESS_TOKEN). Falls back to the anon key when unset.
    pub access_token: Option<String>,
    /// Signed-in user (HOARD_USER_ID)
    pub user_id: Option<uuid::Uuid>,
    pub log_level: String,
    pub request_timeout: Duration,
    pub reviews_page_size: u32,
    pub bids_page_size: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let user_id = match std::env::var("HOARD_USER_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<uuid::Uuid>()
                    .map_err(|_| AppError::Config("HOARD_USER_ID must be a UUID".to_string()))?,
            ),
            _ => None,
        };

        Ok(Self {
            api_url: std::env::var("HOARD_API_URL")
                .unwrap_or_else(|_| API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: std::env::var("HOARD_API_KEY").unwrap_or_default(),
            access_token: std::env::var("HOARD_ACCESS_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            user_id,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "15".to_string())
                    .parse::<u64>()
                    .map_err(|_| {
                        AppError::Config("REQUEST_TIMEOUT_SECS must be a whole number".to_string())
                    })?,
            ),
            reviews_page_size: page_size("REVIEWS_PAGE_SIZE", DEFAULT_REVIEWS_PAGE_SIZE)?,
            bids_page_size: page_size("BIDS_PAGE_SIZE", DEFAULT_BIDS_PAGE_SIZE)?,
        })
    }
}

fn page_size(var: &str, default: u32) -> Result<u32> {
    parse_page_size(var, std::env::var(var).ok().as_deref(), default)
}

/// Unset means the default; anything but a positive whole number is an error.
fn parse_page_size(var: &str, raw: Option<&str>, default: u32) -> Result<u32> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::Config(format!("{var} must be a positive whole number"))),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: API_URL.to_string(),
            api_key: String::new(),
            access_token: None,
            user_id: None,
            log_level: "info".to_string(),
            request_timeout: Duration::from_secs(15),
            reviews_page_size: DEFAULT_REVIEWS_PAGE_SIZE,
            bids_page_size: DEFAULT_BIDS_PAGE_SIZE,
        }
    }
}
