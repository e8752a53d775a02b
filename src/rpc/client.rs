use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::rpc::latency::LatencyStats;
use crate::rpc::RpcTransport;
use crate::session::SessionHandle;

/// Error body returned by the backend for a failed function call.
#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    message: Option<String>,
    code: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// HTTP transport for the marketplace's remote functions.
///
/// Every call is `POST {api_url}/rest/v1/rpc/{function}` with the named
/// parameters as a JSON object. The user's access token is read from the
/// session on each call, so signing in or out takes effect immediately.
pub struct RpcClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    session: SessionHandle,
    latency: Arc<LatencyStats>,
}

impl RpcClient {
    pub fn new(cfg: &Config, session: SessionHandle) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.api_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            session,
            latency: Arc::new(LatencyStats::new()),
        })
    }

    pub fn latency(&self) -> Arc<LatencyStats> {
        Arc::clone(&self.latency)
    }

    fn endpoint(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, function)
    }
}

#[async_trait]
impl RpcTransport for RpcClient {
    async fn call(&self, function: &str, params: Value) -> Result<Value> {
        let bearer = self
            .session
            .access_token()
            .unwrap_or_else(|| self.api_key.clone());

        let started = Instant::now();
        let sent = self
            .http
            .post(self.endpoint(function))
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
            .json(&params)
            .send()
            .await;
        self.latency.record(started.elapsed());

        let resp = match sent {
            Ok(r) => r,
            Err(e) => {
                self.latency.record_failure();
                return Err(e.into());
            }
        };

        let status = resp.status();
        let body = resp.bytes().await?;
        debug!(function, status = status.as_u16(), bytes = body.len(), "RPC response");

        if !status.is_success() {
            self.latency.record_failure();
            let parsed = serde_json::from_slice::<RpcErrorBody>(&body).ok();
            let message = parsed
                .as_ref()
                .and_then(|b| b.message.clone())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| {
                    let text = String::from_utf8_lossy(&body).trim().to_string();
                    if text.is_empty() {
                        status.canonical_reason().unwrap_or("request failed").to_string()
                    } else {
                        text
                    }
                });
            if let Some(b) = &parsed {
                warn!(
                    function,
                    status = status.as_u16(),
                    code = b.code.as_deref().unwrap_or("-"),
                    details = b.details.as_deref().unwrap_or("-"),
                    hint = b.hint.as_deref().unwrap_or("-"),
                    "RPC {function} rejected: {message}",
                );
            }
            return Err(AppError::Rpc {
                function: function.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        // Void functions answer 204 or an empty body.
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&body)?)
    }
}
