use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::rpc::latency::LatencyStats;
use crate::rpc::{Api, RpcClient, RpcTransport};
use crate::session::{Identity, SessionHandle};
use crate::sync::StatusCache;

/// Everything a component needs to talk to the backend: the typed API, the
/// session capability, and the shared alert status cache.
#[derive(Clone)]
pub struct ClientContext {
    pub api: Api,
    pub session: SessionHandle,
    pub cache: Arc<StatusCache>,
    latency: Option<Arc<LatencyStats>>,
}

impl ClientContext {
    pub fn new(api: Api, session: SessionHandle, cache: Arc<StatusCache>) -> Self {
        Self { api, session, cache, latency: None }
    }

    /// Build the HTTP transport from config. Signs in when both a user id and
    /// an access token are configured.
    pub fn connect(cfg: &Config) -> Result<Self> {
        let identity = match (cfg.user_id, cfg.access_token.clone()) {
            (Some(user_id), Some(access_token)) => Some(Identity { user_id, access_token }),
            _ => None,
        };
        let session = SessionHandle::new(identity);
        let client = RpcClient::new(cfg, session.clone())?;
        let latency = client.latency();
        let transport: Arc<dyn RpcTransport> = Arc::new(client);
        info!(api_url = %cfg.api_url, signed_in = session.user_id().is_some(), "Client ready");
        Ok(Self {
            api: Api::new(transport),
            session,
            cache: StatusCache::new(),
            latency: Some(latency),
        })
    }

    pub fn latency(&self) -> Option<Arc<LatencyStats>> {
        self.latency.clone()
    }

    /// Clear the status cache whenever the signed-in user changes, so one
    /// user's alerts never render for another.
    pub fn spawn_identity_watcher(&self) -> JoinHandle<()> {
        let mut rx = self.session.subscribe();
        let cache = Arc::clone(&self.cache);
        let mut last = self.session.user_id();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let now = rx.borrow().as_ref().map(|i| i.user_id);
                if now != last {
                    info!(entries = cache.len(), "Identity changed, clearing alert status cache");
                    cache.clear();
                    last = now;
                }
            }
        })
    }
}

#[cfg(test)]
impl ClientContext {
    pub(crate) fn for_test(
        fake: &Arc<crate::rpc::fake::FakeMarketplace>,
        user: Option<uuid::Uuid>,
    ) -> Self {
        let identity = user.map(|user_id| Identity {
            user_id,
            access_token: "test-token".to_string(),
        });
        Self::new(fake.api(), SessionHandle::new(identity), StatusCache::new())
    }
}
