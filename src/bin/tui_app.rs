use tokio::sync::broadcast::{self, error::TryRecvError};

use hoard_valley::alerts::toggle::{AlertToggle, ToggleOutcome};
use hoard_valley::carousel::{Carousel, ScrollCommand};
use hoard_valley::price_history::PriceHistory;
use hoard_valley::recommendations::{Rail, RailKind, DEFAULT_RAIL_LIMIT};
use hoard_valley::sync::StatusChange;
use hoard_valley::types::{AlertKind, ItemContext, RecommendationItem, StockStatus};
use hoard_valley::ClientContext;

/// Columns one card occupies in the rail, gap included.
pub const CARD_WIDTH: u16 = 26;

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Browse,
    Search,
    TargetPrice,
}

/// Toggles and chart for the selected card.
pub struct Selection {
    pub item: RecommendationItem,
    pub wishlist: AlertToggle,
    pub price_alert: AlertToggle,
    pub history: PriceHistory,
}

pub struct AppState {
    ctx: ClientContext,
    pub status: ConnectionStatus,
    pub rail: Option<Rail>,
    pub carousel: Carousel,
    /// Where the rail is animating to, if a scroll is in progress.
    pub scroll_target: Option<f64>,
    pub selected: usize,
    pub selection: Option<Selection>,
    pub search: String,
    pub mode: InputMode,
    pub message: Option<String>,
    changes: broadcast::Receiver<StatusChange>,
    pub last_refresh: std::time::Instant,
}

impl AppState {
    pub fn new(ctx: ClientContext) -> Self {
        let changes = ctx.cache.subscribe();
        Self {
            ctx,
            status: ConnectionStatus::Connecting,
            rail: None,
            carousel: Carousel::new(),
            scroll_target: None,
            selected: 0,
            selection: None,
            search: String::new(),
            mode: InputMode::Browse,
            message: None,
            changes,
            last_refresh: std::time::Instant::now(),
        }
    }

    pub fn signed_in(&self) -> bool {
        self.ctx.session.user_id().is_some()
    }

    pub fn items(&self) -> &[RecommendationItem] {
        self.rail.as_ref().map(|r| r.items.as_slice()).unwrap_or_default()
    }

    pub async fn refresh(&mut self) {
        match Rail::load(&self.ctx.api, RailKind::ForYou, DEFAULT_RAIL_LIMIT).await {
            Ok(rail) => {
                let shown: Vec<_> = rail.items.iter().map(|i| i.id).collect();
                self.ctx.cache.retain_items(|id| shown.contains(&id));
                self.rail = Some(rail);
                self.status = ConnectionStatus::Connected;
                self.last_refresh = std::time::Instant::now();
                let idx = self.selected.min(self.items().len().saturating_sub(1));
                self.select(idx).await;
            }
            Err(e) => self.status = ConnectionStatus::Error(e.user_message()),
        }
    }

    /// Record the terminal width available to the rail.
    pub fn measure(&mut self, container: u16) {
        let content = self.items().len() as f64 * f64::from(CARD_WIDTH);
        self.carousel.measure(f64::from(container), content);
        let max = self.carousel.max_offset();
        self.scroll_target = self.scroll_target.map(|t| t.min(max));
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    pub async fn select(&mut self, idx: usize) {
        let Some(item) = self.items().get(idx).cloned() else {
            self.selection = None;
            return;
        };
        self.selected = idx;
        self.ctx.api.track_item_view(item.id);

        let listing = ItemContext {
            item_id: item.id,
            seller_id: None,
            price: item.price,
            // Rail cards carry no stock status.
            stock_status: StockStatus::InStock,
        };
        let mut wishlist = AlertToggle::new(AlertKind::Wishlist, listing.clone(), &self.ctx);
        let mut price_alert = AlertToggle::new(AlertKind::PriceAlert, listing, &self.ctx);
        wishlist.mount().await;
        price_alert.mount().await;
        let history = PriceHistory::load(&self.ctx.api, item.id).await.unwrap_or_default();

        self.selection = Some(Selection { item, wishlist, price_alert, history });
        self.follow_selection();
    }

    pub async fn select_next(&mut self) {
        if self.selected + 1 < self.items().len() {
            self.select(self.selected + 1).await;
        }
    }

    pub async fn select_prev(&mut self) {
        if self.selected > 0 {
            self.select(self.selected - 1).await;
        }
    }

    /// Scroll the rail when the selected card is out of view.
    fn follow_selection(&mut self) {
        let start = self.selected as f64 * f64::from(CARD_WIDTH);
        let end = start + f64::from(CARD_WIDTH);
        let view_start = self.scroll_target.unwrap_or(self.carousel.offset());
        let view_end = view_start + self.carousel.container_width();
        let cmd = if end > view_end {
            self.carousel.scroll_right()
        } else if start < view_start {
            self.carousel.scroll_left()
        } else {
            None
        };
        self.start_scroll(cmd);
    }

    pub fn start_scroll(&mut self, cmd: Option<ScrollCommand>) {
        if let Some(cmd) = cmd {
            if cmd.smooth {
                self.scroll_target = Some(cmd.target);
            } else {
                self.carousel.on_scroll(cmd.target);
            }
        }
    }

    /// Advance the scroll animation one frame; the carousel only learns the
    /// new offset through `on_scroll`.
    pub fn tick(&mut self) {
        self.scroll_target = advance_scroll(&mut self.carousel, self.scroll_target);
    }

    // -----------------------------------------------------------------------
    // Toggles
    // -----------------------------------------------------------------------

    pub async fn toggle_wishlist(&mut self) {
        let Some(sel) = self.selection.as_mut() else {
            return;
        };
        let outcome = sel.wishlist.activate().await;
        self.report(outcome);
    }

    pub async fn toggle_price_alert(&mut self) {
        let Some(sel) = self.selection.as_mut() else {
            return;
        };
        let outcome = sel.price_alert.activate().await;
        if outcome == ToggleOutcome::PreferencesOpened {
            self.mode = InputMode::TargetPrice;
        }
        self.report(outcome);
    }

    pub fn edit_target_price(&mut self, c: Option<char>) {
        let Some(form) = self.selection.as_mut().and_then(|s| s.price_alert.form_mut()) else {
            return;
        };
        match c {
            Some(ch) => form.target_price.push(ch),
            None => {
                form.target_price.pop();
            }
        }
    }

    pub async fn confirm_price_alert(&mut self) {
        let Some(sel) = self.selection.as_mut() else {
            return;
        };
        let outcome = sel.price_alert.confirm().await;
        if sel.price_alert.form().is_none() {
            self.mode = InputMode::Browse;
        }
        self.report(outcome);
    }

    pub fn cancel_price_alert(&mut self) {
        if let Some(sel) = self.selection.as_mut() {
            sel.price_alert.cancel_form();
        }
        self.mode = InputMode::Browse;
    }

    fn report(&mut self, outcome: ToggleOutcome) {
        self.message = match outcome {
            ToggleOutcome::RedirectToAuth(r) => Some(format!("Sign in first ({})", r.path)),
            ToggleOutcome::Failed(msg) | ToggleOutcome::Invalid(msg) => Some(msg),
            ToggleOutcome::Armed => Some("Saved".to_string()),
            ToggleOutcome::Disarmed => Some("Removed".to_string()),
            ToggleOutcome::PreferencesOpened => Some("Enter a target price, then press Enter".to_string()),
            ToggleOutcome::Ignored => None,
        };
    }

    /// Apply status changes published elsewhere; re-check invalidated entries.
    pub async fn drain_changes(&mut self) {
        let mut stale = false;
        loop {
            match self.changes.try_recv() {
                Ok(change) => {
                    if let Some(sel) = self.selection.as_mut() {
                        stale |= sel.wishlist.on_status_change(&change);
                        stale |= sel.price_alert.on_status_change(&change);
                    }
                }
                Err(TryRecvError::Lagged(_)) => {
                    if let Some(sel) = self.selection.as_mut() {
                        stale |= sel.wishlist.sync_from_cache();
                        stale |= sel.price_alert.sync_from_cache();
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        if stale {
            if let Some(sel) = self.selection.as_mut() {
                sel.wishlist.mount().await;
                sel.price_alert.mount().await;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// One animation frame toward `target`. The target is clamped to the current
/// bounds; returns None once it is reached.
pub fn advance_scroll(carousel: &mut Carousel, target: Option<f64>) -> Option<f64> {
    let target = target?.clamp(0.0, carousel.max_offset());
    let next = animate_step(carousel.offset(), target);
    carousel.on_scroll(next);
    if (carousel.offset() - target).abs() < f64::EPSILON {
        None
    } else {
        Some(target)
    }
}

/// Ease toward `target`, covering a third of the distance per frame.
pub fn animate_step(current: f64, target: f64) -> f64 {
    let delta = target - current;
    if delta.abs() <= 1.0 {
        return target;
    }
    current + delta / 3.0
}

pub fn format_price(v: f64) -> String {
    format!("${v:.2}")
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

/// Prices as whole cents for the sparkline.
pub fn sparkline_points(series: &[f64]) -> Vec<u64> {
    series.iter().map(|p| (p.max(0.0) * 100.0).round() as u64).collect()
}
