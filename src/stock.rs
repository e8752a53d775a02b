use std::sync::Arc;

use tracing::{info, warn};

use crate::context::ClientContext;
use crate::error::AppError;
use crate::rpc::Api;
use crate::session::{AuthRedirect, SessionHandle};
use crate::sync::{Lifetime, StatusCache};
use crate::types::{AlertKind, ItemContext, StockStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum StockOutcome {
    Updated(StockStatus),
    Unchanged,
    RedirectToAuth(AuthRedirect),
    Forbidden(String),
    Failed(String),
    Ignored,
}

/// Seller-side stock status selector on an item page.
pub struct StockControl {
    api: Api,
    session: SessionHandle,
    cache: Arc<StatusCache>,
    item: ItemContext,
    updating: bool,
    error: Option<String>,
    lifetime: Lifetime,
}

impl StockControl {
    pub fn new(item: ItemContext, ctx: &ClientContext) -> Self {
        Self {
            api: ctx.api.clone(),
            session: ctx.session.clone(),
            cache: Arc::clone(&ctx.cache),
            item,
            updating: false,
            error: None,
            lifetime: Lifetime::new(),
        }
    }

    pub fn status(&self) -> StockStatus {
        self.item.stock_status
    }

    pub fn item(&self) -> &ItemContext {
        &self.item
    }

    pub fn is_updating(&self) -> bool {
        self.updating
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Only the item's seller sees the selector.
    pub fn is_visible(&self) -> bool {
        matches!((self.session.user_id(), self.item.seller_id), (Some(u), Some(s)) if u == s)
    }

    pub async fn set_status(&mut self, new_status: StockStatus) -> StockOutcome {
        let Some(user) = self.session.user_id() else {
            return StockOutcome::RedirectToAuth(AuthRedirect::default());
        };
        if self.item.seller_id != Some(user) {
            let e = AppError::Forbidden("Only the seller can change stock status".to_string());
            return StockOutcome::Forbidden(e.user_message());
        }
        if self.updating || self.lifetime.is_ended() {
            return StockOutcome::Ignored;
        }
        if new_status == self.item.stock_status {
            return StockOutcome::Unchanged;
        }

        self.updating = true;
        self.error = None;
        let item_id = self.item.item_id;
        let res = self
            .lifetime
            .run(self.api.update_item_stock_status(item_id, new_status))
            .await;
        self.updating = false;

        match res {
            Ok(()) => {
                info!(%item_id, status = %new_status, "Stock status updated");
                self.item.stock_status = new_status;
                // Stock alert visibility depends on status; make toggles recheck.
                self.cache.invalidate(AlertKind::StockAlert, item_id);
                StockOutcome::Updated(new_status)
            }
            Err(AppError::Cancelled) => StockOutcome::Ignored,
            Err(e) => {
                warn!(%item_id, "Updating stock status failed: {e}");
                let msg = e.user_message();
                self.error = Some(msg.clone());
                StockOutcome::Failed(msg)
            }
        }
    }
}
