use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::rpc::RpcTransport;
use crate::types::{
    AlertFrequency, AlertKind, BidRecord, NotifyChannels, PriceAlertRecord, PriceHistoryPoint,
    RecommendationItem, ReviewRecord, SavedSearch, StockAlertRecord, StockStatus, WishlistEntry,
};

/// Typed facade over the marketplace's remote functions.
///
/// Cheap to clone; every component holds its own copy.
#[derive(Clone)]
pub struct Api {
    transport: Arc<dyn RpcTransport>,
}

impl Api {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    async fn call_as<T: DeserializeOwned>(&self, function: &str, params: Value) -> Result<T> {
        debug!(function, "RPC call");
        let value = self.transport.call(function, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Set-returning functions answer `null` instead of `[]` when nothing matches.
    async fn call_list<T: DeserializeOwned>(&self, function: &str, params: Value) -> Result<Vec<T>> {
        let rows: Option<Vec<T>> = self.call_as(function, params).await?;
        Ok(rows.unwrap_or_default())
    }

    async fn call_void(&self, function: &str, params: Value) -> Result<()> {
        debug!(function, "RPC call");
        self.transport.call(function, params).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Wishlist
    // -----------------------------------------------------------------------

    pub async fn is_in_wishlist(&self, item_id: Uuid) -> Result<bool> {
        self.call_as("is_in_wishlist", json!({ "item_id": item_id })).await
    }

    pub async fn add_to_wishlist(&self, item_id: Uuid) -> Result<()> {
        self.call_void("add_to_wishlist", json!({ "item_id": item_id })).await
    }

    pub async fn remove_from_wishlist(&self, item_id: Uuid) -> Result<()> {
        self.call_void("remove_from_wishlist", json!({ "item_id": item_id })).await
    }

    pub async fn get_wishlist(&self) -> Result<Vec<WishlistEntry>> {
        self.call_list("get_wishlist", json!({})).await
    }

    // -----------------------------------------------------------------------
    // Price and stock alerts
    // -----------------------------------------------------------------------

    pub async fn has_price_alert(&self, item_id: Uuid) -> Result<bool> {
        self.call_as("has_price_alert", json!({ "item_id": item_id })).await
    }

    pub async fn set_price_alert(
        &self,
        item_id: Uuid,
        target_price: f64,
        channels: NotifyChannels,
    ) -> Result<()> {
        self.call_void(
            "toggle_price_alert",
            json!({
                "item_id": item_id,
                "target_price": target_price,
                "notify_email": channels.email,
                "notify_push": channels.push,
            }),
        )
        .await
    }

    /// A toggle carrying only the item id removes the alert; the backend
    /// reports success when there was nothing to remove.
    pub async fn remove_price_alert(&self, item_id: Uuid) -> Result<()> {
        self.call_void("toggle_price_alert", json!({ "item_id": item_id })).await
    }

    pub async fn get_price_alerts(&self) -> Result<Vec<PriceAlertRecord>> {
        self.call_list("get_price_alerts", json!({})).await
    }

    pub async fn has_stock_alert(&self, item_id: Uuid) -> Result<bool> {
        self.call_as("has_stock_alert", json!({ "item_id": item_id })).await
    }

    pub async fn set_stock_alert(&self, item_id: Uuid, channels: NotifyChannels) -> Result<()> {
        self.call_void(
            "toggle_stock_alert",
            json!({
                "item_id": item_id,
                "notify_email": channels.email,
                "notify_push": channels.push,
            }),
        )
        .await
    }

    pub async fn remove_stock_alert(&self, item_id: Uuid) -> Result<()> {
        self.call_void("toggle_stock_alert", json!({ "item_id": item_id })).await
    }

    pub async fn get_stock_alerts(&self) -> Result<Vec<StockAlertRecord>> {
        self.call_list("get_stock_alerts", json!({})).await
    }

    /// Existence check for any alert kind.
    pub async fn has_alert(&self, kind: AlertKind, item_id: Uuid) -> Result<bool> {
        match kind {
            AlertKind::Wishlist => self.is_in_wishlist(item_id).await,
            AlertKind::PriceAlert => self.has_price_alert(item_id).await,
            AlertKind::StockAlert => self.has_stock_alert(item_id).await,
        }
    }

    /// The toggle-off call shared by toggle buttons and list pages.
    pub async fn disarm(&self, kind: AlertKind, item_id: Uuid) -> Result<()> {
        match kind {
            AlertKind::Wishlist => self.remove_from_wishlist(item_id).await,
            AlertKind::PriceAlert => self.remove_price_alert(item_id).await,
            AlertKind::StockAlert => self.remove_stock_alert(item_id).await,
        }
    }

    // -----------------------------------------------------------------------
    // Reviews and bids
    // -----------------------------------------------------------------------

    pub async fn get_item_reviews(&self, item_id: Uuid, page: u32, limit: u32) -> Result<Vec<ReviewRecord>> {
        self.call_list(
            "get_item_reviews",
            json!({ "item_id": item_id, "page": page, "limit": limit }),
        )
        .await
    }

    pub async fn get_seller_reviews(
        &self,
        seller_id: Uuid,
        page: u32,
        limit: u32,
    ) -> Result<Vec<ReviewRecord>> {
        self.call_list(
            "get_seller_reviews",
            json!({ "seller_id": seller_id, "page": page, "limit": limit }),
        )
        .await
    }

    pub async fn submit_item_review(&self, item_id: Uuid, rating: u8, text: &str) -> Result<()> {
        self.call_void(
            "submit_item_review",
            json!({ "item_id": item_id, "rating": rating, "review_text": text }),
        )
        .await
    }

    /// `item_id` is the purchase the seller review refers to, when known.
    pub async fn submit_seller_review(
        &self,
        seller_id: Uuid,
        item_id: Option<Uuid>,
        rating: u8,
        text: &str,
    ) -> Result<()> {
        self.call_void(
            "submit_seller_review",
            json!({
                "seller_id": seller_id,
                "item_id": item_id,
                "rating": rating,
                "review_text": text,
            }),
        )
        .await
    }

    pub async fn get_item_bids(&self, item_id: Uuid, page: u32, limit: u32) -> Result<Vec<BidRecord>> {
        self.call_list(
            "get_item_bids",
            json!({ "item_id": item_id, "page": page, "limit": limit }),
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    pub async fn update_item_stock_status(&self, item_id: Uuid, new_status: StockStatus) -> Result<()> {
        self.call_void(
            "update_item_stock_status",
            json!({ "item_id": item_id, "new_status": new_status }),
        )
        .await
    }

    pub async fn get_price_history(&self, item_id: Uuid) -> Result<Vec<PriceHistoryPoint>> {
        self.call_list("get_price_history", json!({ "item_id": item_id })).await
    }

    pub async fn get_ai_recommendations(&self, limit: u32) -> Result<Vec<RecommendationItem>> {
        self.call_list("get_ai_recommendations", json!({ "limit": limit })).await
    }

    pub async fn get_recently_viewed(&self, limit: u32) -> Result<Vec<RecommendationItem>> {
        self.call_list("get_recently_viewed", json!({ "limit": limit })).await
    }

    pub async fn get_similar_items(&self, item_id: Uuid, limit: u32) -> Result<Vec<RecommendationItem>> {
        self.call_list("get_similar_items", json!({ "item_id": item_id, "limit": limit }))
            .await
    }

    // -----------------------------------------------------------------------
    // Saved searches
    // -----------------------------------------------------------------------

    pub async fn get_saved_searches_with_alerts(&self) -> Result<Vec<SavedSearch>> {
        self.call_list("get_saved_searches_with_alerts", json!({})).await
    }

    pub async fn toggle_saved_search_alert(
        &self,
        search_id: Uuid,
        enabled: bool,
        frequency: AlertFrequency,
    ) -> Result<()> {
        self.call_void(
            "toggle_saved_search_alert",
            json!({ "search_id": search_id, "enabled": enabled, "frequency": frequency }),
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Analytics (fire-and-forget)
    // -----------------------------------------------------------------------

    pub fn track_item_view(&self, item_id: Uuid) {
        self.fire_and_forget("track_item_view", json!({ "item_id": item_id }));
    }

    pub fn track_profile_view(&self, profile_id: Uuid) {
        self.fire_and_forget("track_profile_view", json!({ "profile_id": profile_id }));
    }

    fn fire_and_forget(&self, function: &'static str, params: Value) {
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            if let Err(e) = transport.call(function, params).await {
                debug!(function, "Analytics call dropped: {e}");
            }
        });
    }
}
