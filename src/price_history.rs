use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::rpc::Api;
use crate::types::PriceHistoryPoint;

/// Price changes of one item, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceHistory {
    points: Vec<PriceHistoryPoint>,
}

impl PriceHistory {
    pub fn new(mut points: Vec<PriceHistoryPoint>) -> Self {
        points.sort_by_key(|p| p.changed_at);
        Self { points }
    }

    pub async fn load(api: &Api, item_id: Uuid) -> Result<Self> {
        match api.get_price_history(item_id).await {
            Ok(points) => Ok(Self::new(points)),
            Err(e) => {
                warn!(%item_id, "Loading price history failed: {e}");
                Err(e)
            }
        }
    }

    pub fn points(&self) -> &[PriceHistoryPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Chart series: the price before the first change, then every new price.
    pub fn series(&self) -> Vec<f64> {
        let Some(first) = self.points.first() else {
            return Vec::new();
        };
        std::iter::once(first.old_price)
            .chain(self.points.iter().map(|p| p.new_price))
            .collect()
    }

    pub fn lowest(&self) -> Option<f64> {
        self.series().into_iter().reduce(f64::min)
    }

    pub fn highest(&self) -> Option<f64> {
        self.series().into_iter().reduce(f64::max)
    }

    /// Percent change from the original price to the latest one.
    pub fn change_percent(&self) -> Option<f64> {
        let first = self.points.first()?.old_price;
        let last = self.points.last()?.new_price;
        if first == 0.0 {
            return None;
        }
        Some((last - first) / first * 100.0)
    }
}
