pub mod api;
pub mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod latency;

pub use api::Api;
pub use client::RpcClient;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// A named remote procedure endpoint. Parameters and results are JSON;
/// `Api` owns the typed shapes.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, function: &str, params: Value) -> Result<Value>;
}
