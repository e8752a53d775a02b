//! "My alerts" pages: wishlist, price alerts, stock alerts.

use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::ClientContext;
use crate::error::{AppError, Result};
use crate::rpc::Api;
use crate::session::{AuthRedirect, SessionHandle};
use crate::sync::{Generation, Lifetime, RequestToken, StatusCache};
use crate::types::{AlertKind, PriceAlertRecord, StockAlertRecord, WishlistEntry};

/// A row that can be removed from an alert list.
pub trait AlertRow: Clone + Send + 'static {
    fn row_id(&self) -> Uuid;
    fn item_id(&self) -> Uuid;
}

impl AlertRow for PriceAlertRecord {
    fn row_id(&self) -> Uuid {
        self.alert.id
    }
    fn item_id(&self) -> Uuid {
        self.alert.item_id
    }
}

impl AlertRow for StockAlertRecord {
    fn row_id(&self) -> Uuid {
        self.alert.id
    }
    fn item_id(&self) -> Uuid {
        self.alert.item_id
    }
}

impl AlertRow for WishlistEntry {
    fn row_id(&self) -> Uuid {
        self.id
    }
    fn item_id(&self) -> Uuid {
        self.item_id
    }
}

/// Binds a page to its listing call and the toggle-off call of its kind.
pub trait AlertListKind: Send + 'static {
    type Row: AlertRow;
    const KIND: AlertKind;
    fn fetch(api: Api) -> BoxFuture<'static, Result<Vec<Self::Row>>>;
}

pub struct PriceAlerts;
pub struct StockAlerts;
pub struct Wishlist;

impl AlertListKind for PriceAlerts {
    type Row = PriceAlertRecord;
    const KIND: AlertKind = AlertKind::PriceAlert;
    fn fetch(api: Api) -> BoxFuture<'static, Result<Vec<Self::Row>>> {
        Box::pin(async move { api.get_price_alerts().await })
    }
}

impl AlertListKind for StockAlerts {
    type Row = StockAlertRecord;
    const KIND: AlertKind = AlertKind::StockAlert;
    fn fetch(api: Api) -> BoxFuture<'static, Result<Vec<Self::Row>>> {
        Box::pin(async move { api.get_stock_alerts().await })
    }
}

impl AlertListKind for Wishlist {
    type Row = WishlistEntry;
    const KIND: AlertKind = AlertKind::Wishlist;
    fn fetch(api: Api) -> BoxFuture<'static, Result<Vec<Self::Row>>> {
        Box::pin(async move { api.get_wishlist().await })
    }
}

/// What the page renders. Exactly one applies, in this priority order.
#[derive(Debug, PartialEq)]
pub enum ListView<'a, R> {
    Loading,
    Error(&'a str),
    Empty,
    Populated(&'a [R]),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Loaded(usize),
    RedirectToAuth(AuthRedirect),
    /// A newer load superseded this one, or the page unmounted.
    Discarded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
    Failed(String),
    Ignored,
}

#[derive(Debug, Clone, Copy)]
pub struct LoadTicket {
    token: RequestToken,
    user: Uuid,
}

pub struct AlertListPage<K: AlertListKind> {
    api: Api,
    session: SessionHandle,
    cache: Arc<StatusCache>,
    rows: Vec<K::Row>,
    loading: bool,
    error: Option<String>,
    /// User whose rows are displayed.
    loaded_for: Option<Uuid>,
    /// Identity the latest load was issued for.
    requested_for: Option<Option<Uuid>>,
    loads: Generation,
    lifetime: Lifetime,
    _kind: PhantomData<K>,
}

pub type PriceAlertsPage = AlertListPage<PriceAlerts>;
pub type StockAlertsPage = AlertListPage<StockAlerts>;
pub type WishlistPage = AlertListPage<Wishlist>;

impl<K: AlertListKind> AlertListPage<K> {
    pub fn new(ctx: &ClientContext) -> Self {
        Self {
            api: ctx.api.clone(),
            session: ctx.session.clone(),
            cache: Arc::clone(&ctx.cache),
            rows: Vec::new(),
            loading: false,
            error: None,
            loaded_for: None,
            requested_for: None,
            loads: Generation::new(),
            lifetime: Lifetime::new(),
            _kind: PhantomData,
        }
    }

    pub fn view(&self) -> ListView<'_, K::Row> {
        if self.loading {
            ListView::Loading
        } else if self.rows.is_empty() {
            match &self.error {
                Some(e) => ListView::Error(e),
                None => ListView::Empty,
            }
        } else {
            ListView::Populated(&self.rows)
        }
    }

    pub fn rows(&self) -> &[K::Row] {
        &self.rows
    }

    /// Error to show alongside already-loaded rows (e.g. a failed removal).
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn load(&mut self) -> PageOutcome {
        let ticket = match self.begin_load() {
            Ok(t) => t,
            Err(redirect) => return PageOutcome::RedirectToAuth(redirect),
        };
        let res = self.lifetime.run(K::fetch(self.api.clone())).await;
        self.finish_load(ticket, res)
    }

    pub fn begin_load(&mut self) -> std::result::Result<LoadTicket, AuthRedirect> {
        self.requested_for = Some(self.session.user_id());
        let Some(user) = self.session.user_id() else {
            self.loads.bump();
            self.rows.clear();
            self.loading = false;
            self.loaded_for = None;
            return Err(AuthRedirect::default());
        };
        if self.loaded_for != Some(user) {
            self.rows.clear();
        }
        self.loading = true;
        self.error = None;
        Ok(LoadTicket {
            token: self.loads.next(),
            user,
        })
    }

    pub fn finish_load(&mut self, ticket: LoadTicket, res: Result<Vec<K::Row>>) -> PageOutcome {
        if !self.loads.is_current(ticket.token) {
            return PageOutcome::Discarded;
        }
        self.loading = false;
        match res {
            Ok(rows) => {
                let n = rows.len();
                self.rows = rows;
                self.loaded_for = Some(ticket.user);
                PageOutcome::Loaded(n)
            }
            Err(AppError::Cancelled) => PageOutcome::Discarded,
            Err(e) => {
                warn!(kind = %K::KIND, "Loading alert list failed: {e}");
                let msg = e.user_message();
                self.rows.clear();
                self.error = Some(msg.clone());
                PageOutcome::Failed(msg)
            }
        }
    }

    /// Reload when the signed-in user differs from the one displayed.
    pub async fn sync_identity(&mut self) -> Option<PageOutcome> {
        if self.requested_for == Some(self.session.user_id()) {
            return None;
        }
        Some(self.load().await)
    }

    /// Remove one alert by row id. The row disappears only after the
    /// backend confirms.
    pub async fn remove(&mut self, row_id: Uuid) -> RemoveOutcome {
        let Some(item_id) = self.rows.iter().find(|r| r.row_id() == row_id).map(|r| r.item_id()) else {
            return RemoveOutcome::NotFound;
        };
        if self.lifetime.is_ended() {
            return RemoveOutcome::Ignored;
        }

        let res = self.lifetime.run(self.api.disarm(K::KIND, item_id)).await;
        match res {
            Ok(()) => {
                info!(kind = %K::KIND, %item_id, "Alert removed from list");
                self.rows.retain(|r| r.row_id() != row_id);
                self.error = None;
                self.cache.confirm(K::KIND, item_id, false);
                RemoveOutcome::Removed
            }
            Err(AppError::Cancelled) => RemoveOutcome::Ignored,
            Err(e) => {
                warn!(kind = %K::KIND, %item_id, "Removing alert failed: {e}");
                let msg = e.user_message();
                self.error = Some(msg.clone());
                RemoveOutcome::Failed(msg)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::fake::FakeMarketplace;
    use crate::session::Identity;
    use crate::types::StockStatus;

    fn signed_in(fake: &Arc<FakeMarketplace>) -> ClientContext {
        ClientContext::for_test(fake, Some(Uuid::new_v4()))
    }

    #[tokio::test]
    async fn populated_after_load() {
        let fake = FakeMarketplace::new();
        let a = fake.add_item("Lamp", 20.0, StockStatus::OutOfStock);
        let b = fake.add_item("Stool", 35.0, StockStatus::LowStock);
        fake.arm(AlertKind::StockAlert, a);
        fake.arm(AlertKind::StockAlert, b);

        let mut page = StockAlertsPage::new(&signed_in(&fake));
        assert_eq!(page.load().await, PageOutcome::Loaded(2));
        match page.view() {
            ListView::Populated(rows) => assert_eq!(rows.len(), 2),
            other => panic!("expected populated, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_and_error_states() {
        let fake = FakeMarketplace::new();
        let mut page = PriceAlertsPage::new(&signed_in(&fake));
        page.load().await;
        assert_eq!(page.view(), ListView::Empty);

        fake.fail_next("get_price_alerts", "Service unavailable");
        assert_eq!(
            page.load().await,
            PageOutcome::Failed("Service unavailable".to_string())
        );
        assert_eq!(page.view(), ListView::Error("Service unavailable"));
    }

    #[tokio::test]
    async fn loading_takes_priority() {
        let fake = FakeMarketplace::new();
        let mut page = WishlistPage::new(&signed_in(&fake));
        let _ticket = page.begin_load().unwrap();
        assert_eq!(page.view(), ListView::Loading);
    }

    #[tokio::test]
    async fn removal_filters_locally_without_refetch() {
        let fake = FakeMarketplace::new();
        let ctx = signed_in(&fake);
        let a = fake.add_item("Lamp", 20.0, StockStatus::InStock);
        let b = fake.add_item("Stool", 35.0, StockStatus::InStock);
        fake.arm(AlertKind::PriceAlert, a);
        fake.arm(AlertKind::PriceAlert, b);

        let mut page = PriceAlertsPage::new(&ctx);
        page.load().await;
        let row = page.rows().iter().find(|r| r.alert.item_id == a).unwrap().alert.id;

        assert_eq!(page.remove(row).await, RemoveOutcome::Removed);
        assert_eq!(page.rows().len(), 1);
        assert_eq!(page.rows()[0].alert.item_id, b);
        assert_eq!(fake.calls_to("get_price_alerts"), 1);
        assert!(!fake.is_armed(AlertKind::PriceAlert, a));
        assert_eq!(ctx.cache.get(AlertKind::PriceAlert, a), Some(false));
    }

    #[tokio::test]
    async fn failed_removal_keeps_row_and_shows_error() {
        let fake = FakeMarketplace::new();
        let a = fake.add_item("Lamp", 20.0, StockStatus::InStock);
        fake.arm(AlertKind::Wishlist, a);

        let mut page = WishlistPage::new(&signed_in(&fake));
        page.load().await;
        let row = page.rows()[0].id;
        fake.fail_next("remove_from_wishlist", "Try again later");

        assert_eq!(
            page.remove(row).await,
            RemoveOutcome::Failed("Try again later".to_string())
        );
        assert_eq!(page.rows().len(), 1);
        assert_eq!(page.error(), Some("Try again later"));
        assert!(matches!(page.view(), ListView::Populated(_)));
        assert_eq!(page.remove(Uuid::new_v4()).await, RemoveOutcome::NotFound);
    }

    #[tokio::test]
    async fn signed_out_page_redirects() {
        let fake = FakeMarketplace::new();
        let ctx = ClientContext::for_test(&fake, None);
        let mut page = StockAlertsPage::new(&ctx);
        assert!(matches!(page.load().await, PageOutcome::RedirectToAuth(_)));
        assert_eq!(fake.total_calls(), 0);
    }

    #[tokio::test]
    async fn identity_change_reloads_and_drops_stale_response() {
        let fake = FakeMarketplace::new();
        let ctx = signed_in(&fake);
        let a = fake.add_item("Lamp", 20.0, StockStatus::OutOfStock);
        fake.arm(AlertKind::StockAlert, a);

        let mut page = StockAlertsPage::new(&ctx);
        let stale = page.begin_load().unwrap();

        ctx.session.sign_in(Identity {
            user_id: Uuid::new_v4(),
            access_token: "other".to_string(),
        });
        let fresh = page.begin_load().unwrap();

        assert_eq!(page.finish_load(stale, Ok(vec![])), PageOutcome::Discarded);
        assert_eq!(page.view(), ListView::Loading);

        let rows = ctx.api.get_stock_alerts().await.unwrap();
        assert_eq!(page.finish_load(fresh, Ok(rows)), PageOutcome::Loaded(1));
        assert!(page.sync_identity().await.is_none());

        ctx.session.sign_in(Identity {
            user_id: Uuid::new_v4(),
            access_token: "third".to_string(),
        });
        assert_eq!(page.sync_identity().await, Some(PageOutcome::Loaded(1)));
        assert_eq!(fake.calls_to("get_stock_alerts"), 2);
    }
}
