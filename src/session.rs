//! Signed-in identity shared by every component.
//!
//! Components never read the token themselves; they ask for the current user
//! before mutating and watch for identity changes to know when to refetch.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use crate::config::AUTH_ENTRY_PATH;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub access_token: String,
}

#[derive(Clone)]
pub struct SessionHandle {
    tx: Arc<watch::Sender<Option<Identity>>>,
}

impl SessionHandle {
    pub fn new(initial: Option<Identity>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn signed_out() -> Self {
        Self::new(None)
    }

    pub fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.tx.borrow().as_ref().map(|i| i.user_id)
    }

    pub fn access_token(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|i| i.access_token.clone())
    }

    /// The signed-in user, or `Unauthenticated` for callers to turn into a redirect.
    pub fn require_user(&self) -> Result<Uuid> {
        self.user_id().ok_or(AppError::Unauthenticated)
    }

    pub fn sign_in(&self, identity: Identity) {
        info!(user_id = %identity.user_id, "Session signed in");
        self.tx.send_replace(Some(identity));
    }

    pub fn sign_out(&self) {
        if self.tx.send_replace(None).is_some() {
            info!("Session signed out");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}

/// Where an unauthenticated action sends the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRedirect {
    pub path: String,
}

impl AuthRedirect {
    pub fn new(return_to: Option<&str>) -> Self {
        let path = match return_to {
            Some(r) if !r.is_empty() => format!("{AUTH_ENTRY_PATH}?redirect={r}"),
            _ => AUTH_ENTRY_PATH.to_string(),
        };
        Self { path }
    }
}

impl Default for AuthRedirect {
    fn default() -> Self {
        Self::new(None)
    }
}
