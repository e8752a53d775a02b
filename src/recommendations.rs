use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::rpc::Api;
use crate::types::RecommendationItem;

pub const DEFAULT_RAIL_LIMIT: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RailKind {
    ForYou,
    RecentlyViewed,
    SimilarTo(Uuid),
}

impl RailKind {
    pub fn title(&self) -> &'static str {
        match self {
            RailKind::ForYou => "Recommended for you",
            RailKind::RecentlyViewed => "Recently viewed",
            RailKind::SimilarTo(_) => "Similar items",
        }
    }
}

/// A read-only row of item cards, kept in server order.
#[derive(Debug, Clone, PartialEq)]
pub struct Rail {
    pub kind: RailKind,
    pub items: Vec<RecommendationItem>,
}

impl Rail {
    pub async fn load(api: &Api, kind: RailKind, limit: u32) -> Result<Self> {
        let res = match kind {
            RailKind::ForYou => api.get_ai_recommendations(limit).await,
            RailKind::RecentlyViewed => api.get_recently_viewed(limit).await,
            RailKind::SimilarTo(item_id) => api.get_similar_items(item_id, limit).await,
        };
        match res {
            Ok(items) => Ok(Self { kind, items }),
            Err(e) => {
                warn!(rail = kind.title(), "Loading rail failed: {e}");
                Err(e)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Position of an item in the rail, if present.
    pub fn position(&self, item_id: Uuid) -> Option<usize> {
        self.items.iter().position(|i| i.id == item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::fake::FakeMarketplace;

    fn card(title: &str, score: f64) -> RecommendationItem {
        RecommendationItem {
            id: Uuid::new_v4(),
            title: title.to_string(),
            price: 10.0,
            images: vec![],
            condition: Some("good".to_string()),
            recommendation_score: Some(score),
            similarity_score: None,
            view_count: None,
        }
    }

    #[tokio::test]
    async fn rail_keeps_server_order() {
        let fake = FakeMarketplace::new();
        let items = vec![card("Low", 0.1), card("High", 0.9)];
        fake.set_recommendations(items.clone());

        let rail = Rail::load(&fake.api(), RailKind::ForYou, 8).await.unwrap();
        assert_eq!(rail.items, items);
        assert_eq!(rail.position(items[1].id), Some(1));
        assert_eq!(fake.last_params("get_ai_recommendations").unwrap()["limit"], 8);
    }

    #[tokio::test]
    async fn similar_rail_passes_item() {
        let fake = FakeMarketplace::new();
        let item = Uuid::new_v4();
        let rail = Rail::load(&fake.api(), RailKind::SimilarTo(item), 4).await.unwrap();
        assert!(rail.is_empty());
        assert_eq!(
            fake.last_params("get_similar_items").unwrap()["item_id"],
            item.to_string()
        );
    }

    #[tokio::test]
    async fn null_response_is_an_empty_rail() {
        let fake = FakeMarketplace::new();
        fake.respond_null("get_recently_viewed");
        let rail = Rail::load(&fake.api(), RailKind::RecentlyViewed, 4).await.unwrap();
        assert!(rail.is_empty());
    }
}
