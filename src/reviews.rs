use tracing::{info, warn};
use uuid::Uuid;

use crate::config::MAX_REVIEW_CHARS;
use crate::context::ClientContext;
use crate::error::{AppError, Result};
use crate::rpc::Api;
use crate::session::{AuthRedirect, SessionHandle};
use crate::sync::Lifetime;
use crate::types::ReviewRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewTarget {
    Item(Uuid),
    /// A seller, optionally tied to the purchase being reviewed.
    Seller { seller_id: Uuid, item_id: Option<Uuid> },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewDraft {
    /// 0 while no star is selected.
    pub rating: u8,
    pub text: String,
}

impl ReviewDraft {
    pub fn validate(&self) -> Result<()> {
        if !(1..=5).contains(&self.rating) {
            return Err(AppError::Validation("Please select a rating".to_string()));
        }
        let text = self.text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("Please write a review".to_string()));
        }
        if text.chars().count() > MAX_REVIEW_CHARS {
            return Err(AppError::Validation(format!(
                "Reviews are limited to {MAX_REVIEW_CHARS} characters"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted,
    RedirectToAuth(AuthRedirect),
    Invalid(String),
    Failed(String),
    Ignored,
}

/// Review composer for one item or seller.
///
/// On `Submitted` the caller refreshes the list showing this target's
/// reviews so the new review appears.
pub struct ReviewForm {
    api: Api,
    session: SessionHandle,
    target: ReviewTarget,
    pub draft: ReviewDraft,
    submitting: bool,
    error: Option<String>,
    lifetime: Lifetime,
}

impl ReviewForm {
    pub fn new(target: ReviewTarget, ctx: &ClientContext) -> Self {
        Self {
            api: ctx.api.clone(),
            session: ctx.session.clone(),
            target,
            draft: ReviewDraft::default(),
            submitting: false,
            error: None,
            lifetime: Lifetime::new(),
        }
    }

    pub fn target(&self) -> ReviewTarget {
        self.target
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn submit(&mut self) -> SubmitOutcome {
        if self.session.require_user().is_err() {
            return SubmitOutcome::RedirectToAuth(AuthRedirect::default());
        }
        if self.submitting || self.lifetime.is_ended() {
            return SubmitOutcome::Ignored;
        }
        if let Err(e) = self.draft.validate() {
            let msg = e.user_message();
            self.error = Some(msg.clone());
            return SubmitOutcome::Invalid(msg);
        }

        self.submitting = true;
        self.error = None;
        let rating = self.draft.rating;
        let text = self.draft.text.trim().to_string();
        let call = {
            let api = self.api.clone();
            let target = self.target;
            async move {
                match target {
                    ReviewTarget::Item(item_id) => api.submit_item_review(item_id, rating, &text).await,
                    ReviewTarget::Seller { seller_id, item_id } => {
                        api.submit_seller_review(seller_id, item_id, rating, &text).await
                    }
                }
            }
        };
        let res = self.lifetime.run(call).await;
        self.submitting = false;

        match res {
            Ok(()) => {
                info!(review_target = ?self.target, rating, "Review submitted");
                self.draft = ReviewDraft::default();
                SubmitOutcome::Submitted
            }
            Err(AppError::Cancelled) => SubmitOutcome::Ignored,
            Err(e) => {
                warn!(review_target = ?self.target, "Submitting review failed: {e}");
                let msg = e.user_message();
                self.error = Some(msg.clone());
                SubmitOutcome::Failed(msg)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RatingSummary {
    pub average: f64,
    pub count: usize,
    /// Count per star, index 0 is one star.
    pub distribution: [usize; 5],
}

impl RatingSummary {
    pub fn from_reviews(reviews: &[ReviewRecord]) -> Option<Self> {
        let mut distribution = [0usize; 5];
        let mut total = 0u32;
        let mut count = 0usize;
        for r in reviews.iter().filter(|r| (1..=5).contains(&r.rating)) {
            distribution[(r.rating - 1) as usize] += 1;
            total += u32::from(r.rating);
            count += 1;
        }
        if count == 0 {
            return None;
        }
        Some(Self {
            average: f64::from(total) / count as f64,
            count,
            distribution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paging::{ItemReviewList, PageLoad};
    use crate::rpc::fake::FakeMarketplace;
    use crate::types::StockStatus;

    fn draft(rating: u8, text: &str) -> ReviewDraft {
        ReviewDraft { rating, text: text.to_string() }
    }

    #[test]
    fn draft_validation() {
        assert!(draft(5, "Lovely condition").validate().is_ok());
        assert!(draft(0, "No stars").validate().is_err());
        assert!(draft(6, "Too many").validate().is_err());
        assert!(draft(3, "   ").validate().is_err());
        assert!(draft(3, &"a".repeat(MAX_REVIEW_CHARS + 1)).validate().is_err());
        assert!(draft(3, &"é".repeat(MAX_REVIEW_CHARS)).validate().is_ok());
    }

    #[tokio::test]
    async fn submit_then_refresh_shows_new_review() {
        let fake = FakeMarketplace::new();
        let item = fake.add_item("Teapot", 25.0, StockStatus::InStock);
        fake.seed_item_reviews(item, 2);
        let ctx = ClientContext::for_test(&fake, Some(Uuid::new_v4()));

        let mut list = ItemReviewList::new(&ctx, 5);
        list.show(item, 0).await;
        let mut form = ReviewForm::new(ReviewTarget::Item(item), &ctx);
        form.draft = draft(4, "  Pours well  ");
        assert_eq!(form.submit().await, SubmitOutcome::Submitted);
        assert_eq!(form.draft, ReviewDraft::default());
        assert_eq!(fake.last_params("submit_item_review").unwrap()["review_text"], "Pours well");

        assert_eq!(list.refresh().await, PageLoad::Appended(3));
        assert_eq!(list.records()[0].review_text.as_deref(), Some("Pours well"));
    }

    #[tokio::test]
    async fn signed_out_and_invalid_drafts_never_call() {
        let fake = FakeMarketplace::new();
        let target = ReviewTarget::Seller { seller_id: Uuid::new_v4(), item_id: None };

        let mut form = ReviewForm::new(target, &ClientContext::for_test(&fake, None));
        form.draft = draft(5, "Fast shipping");
        assert!(matches!(form.submit().await, SubmitOutcome::RedirectToAuth(_)));

        let mut form = ReviewForm::new(target, &ClientContext::for_test(&fake, Some(Uuid::new_v4())));
        form.draft = draft(0, "Fast shipping");
        assert_eq!(form.submit().await, SubmitOutcome::Invalid("Please select a rating".to_string()));
        assert_eq!(fake.total_calls(), 0);
    }

    #[tokio::test]
    async fn backend_rejection_keeps_draft() {
        let fake = FakeMarketplace::new();
        let seller = Uuid::new_v4();
        fake.fail_next("submit_seller_review", "You have already reviewed this seller");
        let ctx = ClientContext::for_test(&fake, Some(Uuid::new_v4()));
        let mut form = ReviewForm::new(ReviewTarget::Seller { seller_id: seller, item_id: None }, &ctx);
        form.draft = draft(2, "Slow");

        assert!(matches!(form.submit().await, SubmitOutcome::Failed(_)));
        assert_eq!(form.error(), Some("You have already reviewed this seller"));
        assert_eq!(form.draft.text, "Slow");
        assert!(!form.is_submitting());
    }

    #[tokio::test]
    async fn summary_from_loaded_reviews() {
        let fake = FakeMarketplace::new();
        let seller = Uuid::new_v4();
        fake.seed_seller_reviews(seller, &[5, 4, 4, 1]);
        let rows = fake.api().get_seller_reviews(seller, 1, 10).await.unwrap();

        let summary = RatingSummary::from_reviews(&rows).unwrap();
        assert_eq!(summary.count, 4);
        assert!((summary.average - 3.5).abs() < 1e-9);
        assert_eq!(summary.distribution, [1, 0, 0, 2, 1]);
        assert!(RatingSummary::from_reviews(&[]).is_none());
    }
}
