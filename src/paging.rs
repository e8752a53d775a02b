//! Append-only paginated lists (item reviews, seller reviews, bid history).
//!
//! A list is bound to one subject id and a refresh key. Changing either
//! resets it and invalidates anything still in flight; a page response is
//! applied only while its request token is current.

use futures_util::future::BoxFuture;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::context::ClientContext;
use crate::error::{AppError, Result};
use crate::rpc::Api;
use crate::sync::{Generation, Lifetime, RequestToken};
use crate::types::{BidRecord, ReviewRecord};

/// One paged listing call.
pub trait PageSource: Send + Sync + 'static {
    type Record: Clone + Send + 'static;
    const NAME: &'static str;
    fn fetch(api: Api, subject: Uuid, page: u32, limit: u32) -> BoxFuture<'static, Result<Vec<Self::Record>>>;
}

pub struct ItemReviews;
pub struct SellerReviews;
pub struct ItemBids;

impl PageSource for ItemReviews {
    type Record = ReviewRecord;
    const NAME: &'static str = "item_reviews";
    fn fetch(api: Api, subject: Uuid, page: u32, limit: u32) -> BoxFuture<'static, Result<Vec<ReviewRecord>>> {
        Box::pin(async move { api.get_item_reviews(subject, page, limit).await })
    }
}

impl PageSource for SellerReviews {
    type Record = ReviewRecord;
    const NAME: &'static str = "seller_reviews";
    fn fetch(api: Api, subject: Uuid, page: u32, limit: u32) -> BoxFuture<'static, Result<Vec<ReviewRecord>>> {
        Box::pin(async move { api.get_seller_reviews(subject, page, limit).await })
    }
}

impl PageSource for ItemBids {
    type Record = BidRecord;
    const NAME: &'static str = "item_bids";
    fn fetch(api: Api, subject: Uuid, page: u32, limit: u32) -> BoxFuture<'static, Result<Vec<BidRecord>>> {
        Box::pin(async move { api.get_item_bids(subject, page, limit).await })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    token: RequestToken,
    pub subject: Uuid,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageLoad {
    /// Records appended by this page.
    Appended(usize),
    /// Nothing was issued: no subject, no more pages, or a load in flight.
    Skipped,
    /// The subject or refresh key changed, or the list was dropped.
    Discarded,
    Failed(String),
}

pub struct PagedList<S: PageSource> {
    api: Api,
    limit: u32,
    subject: Option<Uuid>,
    refresh_key: u64,
    records: Vec<S::Record>,
    /// Last page applied; 0 before the first response.
    page: u32,
    has_more: bool,
    in_flight: bool,
    error: Option<String>,
    loads: Generation,
    lifetime: Lifetime,
}

pub type ItemReviewList = PagedList<ItemReviews>;
pub type SellerReviewList = PagedList<SellerReviews>;
pub type BidHistory = PagedList<ItemBids>;

impl<S: PageSource> PagedList<S> {
    pub fn new(ctx: &ClientContext, limit: u32) -> Self {
        Self {
            api: ctx.api.clone(),
            limit: limit.max(1),
            subject: None,
            refresh_key: 0,
            records: Vec::new(),
            page: 0,
            has_more: true,
            in_flight: false,
            error: None,
            loads: Generation::new(),
            lifetime: Lifetime::new(),
        }
    }

    pub fn records(&self) -> &[S::Record] {
        &self.records
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn subject(&self) -> Option<Uuid> {
        self.subject
    }

    pub fn refresh_key(&self) -> u64 {
        self.refresh_key
    }

    /// Start over for `subject`. Any response still in flight is discarded.
    pub fn reset(&mut self, subject: Uuid, refresh_key: u64) {
        self.loads.bump();
        self.subject = Some(subject);
        self.refresh_key = refresh_key;
        self.records.clear();
        self.page = 0;
        self.has_more = true;
        self.in_flight = false;
        self.error = None;
    }

    /// Show `subject`, resetting and fetching page 1 only when the subject or
    /// the refresh key differs from what is displayed.
    pub async fn show(&mut self, subject: Uuid, refresh_key: u64) -> PageLoad {
        if self.subject == Some(subject) && self.refresh_key == refresh_key {
            return PageLoad::Skipped;
        }
        self.reset(subject, refresh_key);
        self.load_more().await
    }

    /// Reset the current subject under a new refresh key and refetch page 1.
    pub async fn refresh(&mut self) -> PageLoad {
        let Some(subject) = self.subject else {
            return PageLoad::Skipped;
        };
        let key = self.refresh_key.wrapping_add(1);
        self.show(subject, key).await
    }

    pub fn begin_load(&mut self) -> Option<PageRequest> {
        let subject = self.subject?;
        if !self.has_more || self.in_flight {
            return None;
        }
        self.in_flight = true;
        Some(PageRequest {
            token: self.loads.next(),
            subject,
            page: self.page + 1,
            limit: self.limit,
        })
    }

    pub fn apply(&mut self, req: PageRequest, res: Result<Vec<S::Record>>) -> PageLoad {
        if !self.loads.is_current(req.token) {
            debug!(source = S::NAME, subject = %req.subject, page = req.page, "Discarding stale page");
            return PageLoad::Discarded;
        }
        self.in_flight = false;
        match res {
            Ok(rows) => {
                let n = rows.len();
                // A full page means more may exist; an exactly-full last page
                // costs one extra empty fetch.
                self.has_more = n == req.limit as usize;
                self.page = req.page;
                self.records.extend(rows);
                self.error = None;
                PageLoad::Appended(n)
            }
            Err(AppError::Cancelled) => PageLoad::Discarded,
            Err(e) => {
                warn!(source = S::NAME, subject = %req.subject, page = req.page, "Loading page failed: {e}");
                if req.page == 1 {
                    self.records.clear();
                }
                // No further load-more until the subject or refresh key changes.
                self.has_more = false;
                let msg = e.user_message();
                self.error = Some(msg.clone());
                PageLoad::Failed(msg)
            }
        }
    }

    pub async fn load_more(&mut self) -> PageLoad {
        let Some(req) = self.begin_load() else {
            return PageLoad::Skipped;
        };
        let res = self
            .lifetime
            .run(S::fetch(self.api.clone(), req.subject, req.page, req.limit))
            .await;
        self.apply(req, res)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::fake::FakeMarketplace;
    use crate::types::StockStatus;
    use std::sync::Arc;

    fn ctx(fake: &Arc<FakeMarketplace>) -> ClientContext {
        ClientContext::for_test(fake, None)
    }

    #[tokio::test]
    async fn full_first_page_implies_more() {
        let fake = FakeMarketplace::new();
        let item = fake.add_item("Globe", 80.0, StockStatus::InStock);
        fake.seed_item_reviews(item, 7);

        let mut list = ItemReviewList::new(&ctx(&fake), 5);
        assert_eq!(list.show(item, 0).await, PageLoad::Appended(5));
        assert!(list.has_more());

        assert_eq!(list.load_more().await, PageLoad::Appended(2));
        assert!(!list.has_more());
        assert_eq!(list.records().len(), 7);
        assert_eq!(list.page(), 2);
    }

    #[tokio::test]
    async fn short_first_page_stops_paging() {
        let fake = FakeMarketplace::new();
        let item = fake.add_item("Globe", 80.0, StockStatus::InStock);
        fake.seed_item_reviews(item, 3);

        let mut list = ItemReviewList::new(&ctx(&fake), 5);
        assert_eq!(list.show(item, 0).await, PageLoad::Appended(3));
        assert!(!list.has_more());
        assert_eq!(list.load_more().await, PageLoad::Skipped);
        assert_eq!(fake.calls_to("get_item_reviews"), 1);
    }

    #[tokio::test]
    async fn exactly_full_last_page_costs_one_empty_fetch() {
        let fake = FakeMarketplace::new();
        let item = fake.add_item("Clock", 120.0, StockStatus::InStock);
        fake.seed_bids(item, 10);

        let mut bids = BidHistory::new(&ctx(&fake), 10);
        assert_eq!(bids.show(item, 0).await, PageLoad::Appended(10));
        assert!(bids.has_more());
        assert_eq!(bids.load_more().await, PageLoad::Appended(0));
        assert!(!bids.has_more());
        assert_eq!(fake.calls_to("get_item_bids"), 2);
        assert_eq!(fake.last_params("get_item_bids").unwrap()["page"], 2);
    }

    #[tokio::test]
    async fn stale_subject_response_is_discarded() {
        let fake = FakeMarketplace::new();
        let old_item = fake.add_item("Old", 1.0, StockStatus::InStock);
        let new_item = fake.add_item("New", 2.0, StockStatus::InStock);
        fake.seed_item_reviews(old_item, 5);
        fake.seed_item_reviews(new_item, 2);

        let mut list = ItemReviewList::new(&ctx(&fake), 5);
        list.reset(old_item, 0);
        let stale = list.begin_load().unwrap();
        let stale_rows = fake.api().get_item_reviews(old_item, 1, 5).await;

        assert_eq!(list.show(new_item, 0).await, PageLoad::Appended(2));
        assert_eq!(list.apply(stale, stale_rows), PageLoad::Discarded);
        assert_eq!(list.records().len(), 2);
        assert_eq!(list.subject(), Some(new_item));
    }

    #[tokio::test]
    async fn no_second_request_while_in_flight() {
        let fake = FakeMarketplace::new();
        let mut list = SellerReviewList::new(&ctx(&fake), 5);
        list.reset(Uuid::new_v4(), 0);
        assert!(list.begin_load().is_some());
        assert!(list.is_loading());
        assert!(list.begin_load().is_none());
    }

    #[tokio::test]
    async fn first_page_error_clears_and_stops() {
        let fake = FakeMarketplace::new();
        let seller = Uuid::new_v4();
        fake.seed_seller_reviews(seller, &[5, 4]);
        fake.fail_next("get_seller_reviews", "Database unavailable");

        let mut list = SellerReviewList::new(&ctx(&fake), 5);
        assert_eq!(
            list.show(seller, 0).await,
            PageLoad::Failed("Database unavailable".to_string())
        );
        assert!(list.records().is_empty());
        assert!(!list.has_more());
        assert_eq!(list.load_more().await, PageLoad::Skipped);
    }

    #[tokio::test]
    async fn later_page_error_keeps_records_until_refresh() {
        let fake = FakeMarketplace::new();
        let item = fake.add_item("Chest", 300.0, StockStatus::InStock);
        fake.seed_item_reviews(item, 8);

        let mut list = ItemReviewList::new(&ctx(&fake), 5);
        list.show(item, 0).await;
        fake.fail_next("get_item_reviews", "Timeout");
        assert_eq!(list.load_more().await, PageLoad::Failed("Timeout".to_string()));
        assert_eq!(list.records().len(), 5);
        assert_eq!(list.error(), Some("Timeout"));
        assert!(!list.has_more());

        assert_eq!(list.refresh().await, PageLoad::Appended(5));
        assert_eq!(list.refresh_key(), 1);
        assert!(list.error().is_none());
        assert!(list.has_more());
    }

    #[tokio::test]
    async fn same_subject_and_key_does_not_refetch() {
        let fake = FakeMarketplace::new();
        let item = fake.add_item("Vase", 15.0, StockStatus::InStock);
        let mut list = ItemReviewList::new(&ctx(&fake), 5);
        list.show(item, 3).await;
        assert_eq!(list.show(item, 3).await, PageLoad::Skipped);
        assert_eq!(fake.calls_to("get_item_reviews"), 1);
    }
}
