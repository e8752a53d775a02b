use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// The kinds of per-item subscription a toggle can arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Wishlist,
    PriceAlert,
    StockAlert,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AlertKind::Wishlist => "wishlist",
            AlertKind::PriceAlert => "price_alert",
            AlertKind::StockAlert => "stock_alert",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: Uuid,
    pub item_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub notify_email: bool,
    #[serde(default)]
    pub notify_push: bool,
}

/// Row of `get_price_alerts`: the alert plus a snapshot of the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlertRecord {
    #[serde(flatten)]
    pub alert: AlertRecord,
    pub target_price: f64,
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Row of `get_stock_alerts`: the alert plus a snapshot of the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAlertRecord {
    #[serde(flatten)]
    pub alert: AlertRecord,
    pub title: String,
    pub stock_status: StockStatus,
    pub price: f64,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub id: Uuid,
    pub item_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Notification channels chosen in the preferences form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyChannels {
    pub email: bool,
    pub push: bool,
}

impl NotifyChannels {
    pub fn any(&self) -> bool {
        self.email || self.push
    }
}

impl Default for NotifyChannels {
    fn default() -> Self {
        Self { email: true, push: true }
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StockStatus::InStock => "in_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for StockStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "in_stock" => Ok(StockStatus::InStock),
            "low_stock" => Ok(StockStatus::LowStock),
            "out_of_stock" => Ok(StockStatus::OutOfStock),
            other => Err(format!("unknown stock status: {other}")),
        }
    }
}

/// What an item detail page knows about the item it renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemContext {
    pub item_id: Uuid,
    /// Unknown on cards that only carry a recommendation snapshot.
    pub seller_id: Option<Uuid>,
    pub price: f64,
    pub stock_status: StockStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistoryPoint {
    pub old_price: f64,
    pub new_price: f64,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub id: Uuid,
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub images: Vec<String>,
    pub condition: Option<String>,
    pub recommendation_score: Option<f64>,
    pub similarity_score: Option<f64>,
    pub view_count: Option<u64>,
}

// ---------------------------------------------------------------------------
// Reviews and bids
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonSummary {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: Uuid,
    pub rating: u8,
    pub review_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author: PersonSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidRecord {
    pub id: Uuid,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    pub bidder: PersonSummary,
}

// ---------------------------------------------------------------------------
// Saved searches
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertFrequency {
    Instant,
    Daily,
    Weekly,
}

impl std::fmt::Display for AlertFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AlertFrequency::Instant => "instant",
            AlertFrequency::Daily => "daily",
            AlertFrequency::Weekly => "weekly",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSearch {
    pub id: Uuid,
    pub name: String,
    pub query: String,
    /// Free-form; the shape is owned by the search page and never validated here.
    #[serde(default, deserialize_with = "lenient_filters")]
    pub filters: serde_json::Map<String, serde_json::Value>,
    pub alert_enabled: bool,
    pub alert_frequency: AlertFrequency,
    pub last_alert_sent: Option<DateTime<Utc>>,
}

/// Anything other than a JSON object (usually `null`) reads as no filters.
fn lenient_filters<'de, D>(de: D) -> Result<serde_json::Map<String, serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(de)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}
