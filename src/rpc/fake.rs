//! In-memory marketplace backend for tests.
//!
//! Implements the same function names and toggle semantics as the real
//! backend, records every call, and lets a test inject failures, `null`
//! responses, or calls that never resolve.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::rpc::{Api, RpcTransport};
use crate::types::{
    AlertFrequency, AlertKind, AlertRecord, BidRecord, NotifyChannels, PersonSummary,
    PriceAlertRecord, PriceHistoryPoint, RecommendationItem, ReviewRecord, SavedSearch,
    StockAlertRecord, StockStatus, WishlistEntry,
};

#[derive(Debug, Clone)]
struct CatalogItem {
    title: String,
    price: f64,
    stock_status: StockStatus,
}

#[derive(Default)]
struct FakeState {
    catalog: HashMap<Uuid, CatalogItem>,
    wishlist: HashSet<Uuid>,
    price_alerts: HashMap<Uuid, (f64, NotifyChannels)>,
    stock_alerts: HashMap<Uuid, NotifyChannels>,
    item_reviews: HashMap<Uuid, Vec<ReviewRecord>>,
    seller_reviews: HashMap<Uuid, Vec<ReviewRecord>>,
    bids: HashMap<Uuid, Vec<BidRecord>>,
    saved_searches: Vec<SavedSearch>,
    history: HashMap<Uuid, Vec<PriceHistoryPoint>>,
    recommendations: Vec<RecommendationItem>,
    calls: Vec<(String, Value)>,
    failures: HashMap<String, Vec<String>>,
    nulls: HashSet<String>,
    hanging: HashSet<String>,
}

pub(crate) struct FakeMarketplace {
    state: Mutex<FakeState>,
}

fn uuid_param(params: &Value, name: &str) -> Uuid {
    params[name]
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("missing uuid param {name} in {params}"))
}

fn page_params(params: &Value) -> (usize, usize) {
    let page = params["page"].as_u64().unwrap_or(1).max(1) as usize;
    let limit = params["limit"].as_u64().unwrap_or(10) as usize;
    (page, limit)
}

fn page_of<T: Clone>(rows: &[T], page: usize, limit: usize) -> Vec<T> {
    rows.iter().skip((page - 1) * limit).take(limit).cloned().collect()
}

fn person(name: &str) -> PersonSummary {
    PersonSummary {
        id: Uuid::new_v4(),
        username: name.to_string(),
        avatar_url: None,
    }
}

fn alert_row(item_id: Uuid, channels: NotifyChannels) -> AlertRecord {
    AlertRecord {
        id: Uuid::new_v4(),
        item_id,
        created_at: Utc::now(),
        notify_email: channels.email,
        notify_push: channels.push,
    }
}

fn review(n: usize, rating: u8, text: &str) -> ReviewRecord {
    ReviewRecord {
        id: Uuid::new_v4(),
        rating,
        review_text: Some(text.to_string()),
        created_at: Utc::now() - Duration::minutes(n as i64),
        author: person(&format!("reviewer{n}")),
    }
}

impl FakeMarketplace {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState::default()),
        })
    }

    pub(crate) fn api(self: &Arc<Self>) -> Api {
        Api::new(Arc::clone(self) as Arc<dyn RpcTransport>)
    }

    pub(crate) fn add_item(&self, title: &str, price: f64, stock_status: StockStatus) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().catalog.insert(
            id,
            CatalogItem {
                title: title.to_string(),
                price,
                stock_status,
            },
        );
        id
    }

    /// Create a remote alert row directly, as another device would.
    pub(crate) fn arm(&self, kind: AlertKind, item_id: Uuid) {
        let mut st = self.state.lock().unwrap();
        match kind {
            AlertKind::Wishlist => {
                st.wishlist.insert(item_id);
            }
            AlertKind::PriceAlert => {
                let price = st.catalog.get(&item_id).map(|c| c.price).unwrap_or(100.0);
                st.price_alerts.insert(item_id, (price * 0.9, NotifyChannels::default()));
            }
            AlertKind::StockAlert => {
                st.stock_alerts.insert(item_id, NotifyChannels::default());
            }
        }
    }

    pub(crate) fn is_armed(&self, kind: AlertKind, item_id: Uuid) -> bool {
        let st = self.state.lock().unwrap();
        match kind {
            AlertKind::Wishlist => st.wishlist.contains(&item_id),
            AlertKind::PriceAlert => st.price_alerts.contains_key(&item_id),
            AlertKind::StockAlert => st.stock_alerts.contains_key(&item_id),
        }
    }

    pub(crate) fn stock_channels(&self, item_id: Uuid) -> Option<NotifyChannels> {
        self.state.lock().unwrap().stock_alerts.get(&item_id).copied()
    }

    pub(crate) fn stock_status(&self, item_id: Uuid) -> Option<StockStatus> {
        self.state.lock().unwrap().catalog.get(&item_id).map(|c| c.stock_status)
    }

    pub(crate) fn seed_item_reviews(&self, item_id: Uuid, count: usize) {
        let rows = (0..count).map(|n| review(n, 5 - (n % 5) as u8, "Great")).collect();
        self.state.lock().unwrap().item_reviews.insert(item_id, rows);
    }

    pub(crate) fn seed_seller_reviews(&self, seller_id: Uuid, ratings: &[u8]) {
        let rows = ratings
            .iter()
            .enumerate()
            .map(|(n, &r)| review(n, r, "Seller review"))
            .collect();
        self.state.lock().unwrap().seller_reviews.insert(seller_id, rows);
    }

    pub(crate) fn seed_bids(&self, item_id: Uuid, count: usize) {
        let rows = (0..count)
            .map(|n| BidRecord {
                id: Uuid::new_v4(),
                amount: 100.0 - n as f64,
                created_at: Utc::now() - Duration::minutes(n as i64),
                bidder: person(&format!("bidder{n}")),
            })
            .collect();
        self.state.lock().unwrap().bids.insert(item_id, rows);
    }

    pub(crate) fn add_saved_search(&self, name: &str, query: &str, alert_enabled: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().saved_searches.push(SavedSearch {
            id,
            name: name.to_string(),
            query: query.to_string(),
            filters: serde_json::Map::new(),
            alert_enabled,
            alert_frequency: AlertFrequency::Daily,
            last_alert_sent: None,
        });
        id
    }

    pub(crate) fn saved_search(&self, id: Uuid) -> Option<SavedSearch> {
        self.state
            .lock()
            .unwrap()
            .saved_searches
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    pub(crate) fn seed_history(&self, item_id: Uuid, points: Vec<PriceHistoryPoint>) {
        self.state.lock().unwrap().history.insert(item_id, points);
    }

    pub(crate) fn set_recommendations(&self, items: Vec<RecommendationItem>) {
        self.state.lock().unwrap().recommendations = items;
    }

    /// The next call to `function` fails with `message`. Stacks.
    pub(crate) fn fail_next(&self, function: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(function.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub(crate) fn respond_null(&self, function: &str) {
        self.state.lock().unwrap().nulls.insert(function.to_string());
    }

    /// Calls to `function` never resolve.
    pub(crate) fn hang(&self, function: &str) {
        self.state.lock().unwrap().hanging.insert(function.to_string());
    }

    pub(crate) fn calls_to(&self, function: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(f, _)| f == function)
            .count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub(crate) fn last_params(&self, function: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .rev()
            .find(|(f, _)| f == function)
            .map(|(_, p)| p.clone())
    }
}

impl FakeState {
    fn dispatch(&mut self, function: &str, params: &Value) -> Result<Value> {
        let value = match function {
            "is_in_wishlist" => json!(self.wishlist.contains(&uuid_param(params, "item_id"))),
            "add_to_wishlist" => {
                self.wishlist.insert(uuid_param(params, "item_id"));
                Value::Null
            }
            "remove_from_wishlist" => {
                self.wishlist.remove(&uuid_param(params, "item_id"));
                Value::Null
            }
            "get_wishlist" => {
                let rows: Vec<WishlistEntry> = self
                    .wishlist
                    .iter()
                    .filter_map(|id| {
                        self.catalog.get(id).map(|c| WishlistEntry {
                            id: Uuid::new_v4(),
                            item_id: *id,
                            created_at: Utc::now(),
                            title: c.title.clone(),
                            price: c.price,
                            images: vec![],
                        })
                    })
                    .collect();
                serde_json::to_value(rows)?
            }
            "has_price_alert" => json!(self.price_alerts.contains_key(&uuid_param(params, "item_id"))),
            "toggle_price_alert" => {
                let item_id = uuid_param(params, "item_id");
                match params["target_price"].as_f64() {
                    Some(target) => {
                        let channels = NotifyChannels {
                            email: params["notify_email"].as_bool().unwrap_or(true),
                            push: params["notify_push"].as_bool().unwrap_or(true),
                        };
                        self.price_alerts.insert(item_id, (target, channels));
                    }
                    None => {
                        self.price_alerts.remove(&item_id);
                    }
                }
                Value::Null
            }
            "get_price_alerts" => {
                let rows: Vec<PriceAlertRecord> = self
                    .price_alerts
                    .iter()
                    .filter_map(|(id, (target, channels))| {
                        self.catalog.get(id).map(|c| PriceAlertRecord {
                            alert: alert_row(*id, *channels),
                            target_price: *target,
                            title: c.title.clone(),
                            price: c.price,
                            images: vec![],
                        })
                    })
                    .collect();
                serde_json::to_value(rows)?
            }
            "has_stock_alert" => json!(self.stock_alerts.contains_key(&uuid_param(params, "item_id"))),
            "toggle_stock_alert" => {
                let item_id = uuid_param(params, "item_id");
                let email = params["notify_email"].as_bool();
                let push = params["notify_push"].as_bool();
                if email.is_some() || push.is_some() {
                    self.stock_alerts.insert(
                        item_id,
                        NotifyChannels {
                            email: email.unwrap_or(false),
                            push: push.unwrap_or(false),
                        },
                    );
                } else {
                    self.stock_alerts.remove(&item_id);
                }
                Value::Null
            }
            "get_stock_alerts" => {
                let rows: Vec<StockAlertRecord> = self
                    .stock_alerts
                    .iter()
                    .filter_map(|(id, channels)| {
                        self.catalog.get(id).map(|c| StockAlertRecord {
                            alert: alert_row(*id, *channels),
                            title: c.title.clone(),
                            stock_status: c.stock_status,
                            price: c.price,
                            images: vec![],
                        })
                    })
                    .collect();
                serde_json::to_value(rows)?
            }
            "get_item_reviews" => {
                let (page, limit) = page_params(params);
                let rows = self
                    .item_reviews
                    .get(&uuid_param(params, "item_id"))
                    .map(|r| page_of(r, page, limit))
                    .unwrap_or_default();
                serde_json::to_value(rows)?
            }
            "get_seller_reviews" => {
                let (page, limit) = page_params(params);
                let rows = self
                    .seller_reviews
                    .get(&uuid_param(params, "seller_id"))
                    .map(|r| page_of(r, page, limit))
                    .unwrap_or_default();
                serde_json::to_value(rows)?
            }
            "get_item_bids" => {
                let (page, limit) = page_params(params);
                let rows = self
                    .bids
                    .get(&uuid_param(params, "item_id"))
                    .map(|r| page_of(r, page, limit))
                    .unwrap_or_default();
                serde_json::to_value(rows)?
            }
            "submit_item_review" | "submit_seller_review" => {
                let (key, map) = if function == "submit_item_review" {
                    (uuid_param(params, "item_id"), &mut self.item_reviews)
                } else {
                    (uuid_param(params, "seller_id"), &mut self.seller_reviews)
                };
                let rating = params["rating"].as_u64().unwrap_or(0) as u8;
                let text = params["review_text"].as_str().unwrap_or_default();
                map.entry(key).or_default().insert(0, review(0, rating, text));
                Value::Null
            }
            "update_item_stock_status" => {
                let item_id = uuid_param(params, "item_id");
                let status: StockStatus = serde_json::from_value(params["new_status"].clone())?;
                match self.catalog.get_mut(&item_id) {
                    Some(item) => item.stock_status = status,
                    None => return Err(rpc_error(function, 404, "Item not found")),
                }
                Value::Null
            }
            "get_saved_searches_with_alerts" => serde_json::to_value(&self.saved_searches)?,
            "toggle_saved_search_alert" => {
                let search_id = uuid_param(params, "search_id");
                let enabled = params["enabled"].as_bool().unwrap_or(false);
                let frequency: AlertFrequency = serde_json::from_value(params["frequency"].clone())?;
                match self.saved_searches.iter_mut().find(|s| s.id == search_id) {
                    Some(search) => {
                        search.alert_enabled = enabled;
                        search.alert_frequency = frequency;
                    }
                    None => return Err(rpc_error(function, 404, "Saved search not found")),
                }
                Value::Null
            }
            "get_price_history" => {
                let rows = self
                    .history
                    .get(&uuid_param(params, "item_id"))
                    .cloned()
                    .unwrap_or_default();
                serde_json::to_value(rows)?
            }
            "get_ai_recommendations" | "get_recently_viewed" | "get_similar_items" => {
                serde_json::to_value(&self.recommendations)?
            }
            "track_item_view" | "track_profile_view" => Value::Null,
            other => return Err(rpc_error(other, 404, "function not found")),
        };
        Ok(value)
    }
}

fn rpc_error(function: &str, status: u16, message: &str) -> AppError {
    AppError::Rpc {
        function: function.to_string(),
        status,
        message: message.to_string(),
    }
}

#[async_trait]
impl RpcTransport for FakeMarketplace {
    async fn call(&self, function: &str, params: Value) -> Result<Value> {
        let hang = {
            let mut st = self.state.lock().unwrap();
            st.calls.push((function.to_string(), params.clone()));
            if let Some(queue) = st.failures.get_mut(function) {
                if !queue.is_empty() {
                    let message = queue.remove(0);
                    return Err(rpc_error(function, 500, &message));
                }
            }
            st.hanging.contains(function)
        };
        if hang {
            std::future::pending::<()>().await;
        }
        let mut st = self.state.lock().unwrap();
        if st.nulls.contains(function) {
            return Ok(Value::Null);
        }
        st.dispatch(function, &params)
    }
}
