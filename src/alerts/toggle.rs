//! Per-item alert toggle: wishlist heart, price-alert and stock-alert buttons.
//!
//! The armed flag is only changed after a call resolves. Existence checks and
//! mutations both go through the shared `StatusCache`, so every toggle for the
//! same item converges on one value.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::context::ClientContext;
use crate::error::{AppError, Result};
use crate::rpc::Api;
use crate::session::{AuthRedirect, SessionHandle};
use crate::sync::{Generation, Lifetime, RequestToken, StatusCache, StatusChange};
use crate::types::{AlertKind, ItemContext, NotifyChannels, StockStatus};

// ---------------------------------------------------------------------------
// Preferences form
// ---------------------------------------------------------------------------

/// Validated contents of the preferences form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertPreferences {
    pub target_price: Option<f64>,
    pub channels: NotifyChannels,
}

/// The modal opened when arming a price or stock alert.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferencesForm {
    kind: AlertKind,
    /// Raw text of the target price input.
    pub target_price: String,
    pub channels: NotifyChannels,
    /// Inline message shown inside the modal.
    pub error: Option<String>,
    pub submitting: bool,
}

impl PreferencesForm {
    fn new(kind: AlertKind) -> Self {
        Self {
            kind,
            target_price: String::new(),
            channels: NotifyChannels::default(),
            error: None,
            submitting: false,
        }
    }

    pub fn kind(&self) -> AlertKind {
        self.kind
    }

    pub fn validate(&self, current_price: f64) -> Result<AlertPreferences> {
        match self.kind {
            AlertKind::PriceAlert => {
                let target = self
                    .target_price
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|p| p.is_finite() && *p > 0.0)
                    .ok_or_else(|| AppError::Validation("Please enter a valid price".to_string()))?;
                if target >= current_price {
                    return Err(AppError::Validation(
                        "Target price must be lower than the current price".to_string(),
                    ));
                }
                Ok(AlertPreferences {
                    target_price: Some(target),
                    channels: self.channels,
                })
            }
            AlertKind::StockAlert => {
                if !self.channels.any() {
                    return Err(AppError::Validation(
                        "Choose at least one way to be notified".to_string(),
                    ));
                }
                Ok(AlertPreferences {
                    target_price: None,
                    channels: self.channels,
                })
            }
            AlertKind::Wishlist => Ok(AlertPreferences {
                target_price: None,
                channels: self.channels,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Toggle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    /// First check has not settled yet.
    Unknown,
    Armed,
    Unarmed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    /// Signed out; nothing was called.
    RedirectToAuth(AuthRedirect),
    /// A call is already in flight or the component is gone.
    Ignored,
    PreferencesOpened,
    Armed,
    Disarmed,
    /// Local validation rejected the form; nothing was called.
    Invalid(String),
    /// The remote call failed; state is unchanged.
    Failed(String),
}

/// Handed out by `begin_check`, returned to `finish_check`.
#[derive(Debug, Clone, Copy)]
pub struct CheckTicket {
    token: RequestToken,
    seen_version: u64,
}

pub struct AlertToggle {
    kind: AlertKind,
    item: ItemContext,
    api: Api,
    session: SessionHandle,
    cache: Arc<StatusCache>,
    armed: Option<bool>,
    loading: bool,
    form: Option<PreferencesForm>,
    error: Option<String>,
    return_to: Option<String>,
    checks: Generation,
    lifetime: Lifetime,
}

impl AlertToggle {
    pub fn new(kind: AlertKind, item: ItemContext, ctx: &ClientContext) -> Self {
        Self {
            kind,
            item,
            api: ctx.api.clone(),
            session: ctx.session.clone(),
            cache: Arc::clone(&ctx.cache),
            armed: None,
            loading: false,
            form: None,
            error: None,
            return_to: None,
            checks: Generation::new(),
            lifetime: Lifetime::new(),
        }
    }

    /// Page to come back to after signing in.
    pub fn with_return_to(mut self, path: impl Into<String>) -> Self {
        self.return_to = Some(path.into());
        self
    }

    pub fn kind(&self) -> AlertKind {
        self.kind
    }

    pub fn item(&self) -> &ItemContext {
        &self.item
    }

    pub fn state(&self) -> ToggleState {
        match self.armed {
            Some(true) => ToggleState::Armed,
            Some(false) => ToggleState::Unarmed,
            None => ToggleState::Unknown,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed == Some(true)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn form(&self) -> Option<&PreferencesForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut PreferencesForm> {
        self.form.as_mut()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Handle that unmounts this toggle from another task.
    pub fn unmount_handle(&self) -> CancellationToken {
        self.lifetime.handle()
    }

    /// Stock alerts only make sense while the item cannot be bought, and no
    /// button is offered on the viewer's own listing.
    pub fn is_visible(&self) -> bool {
        let own_listing = matches!(
            (self.session.user_id(), self.item.seller_id),
            (Some(viewer), Some(seller)) if viewer == seller
        );
        if own_listing {
            return false;
        }
        match self.kind {
            AlertKind::StockAlert => self.item.stock_status != StockStatus::InStock,
            AlertKind::Wishlist | AlertKind::PriceAlert => true,
        }
    }

    pub fn label(&self) -> &'static str {
        match (self.kind, self.is_armed()) {
            (AlertKind::StockAlert, true) => "Alert Set",
            (AlertKind::StockAlert, false) => "Notify Me",
            (AlertKind::PriceAlert, true) => "Price Alert Set",
            (AlertKind::PriceAlert, false) => "Set Price Alert",
            (AlertKind::Wishlist, true) => "In Wishlist",
            (AlertKind::Wishlist, false) => "Add to Wishlist",
        }
    }

    // -----------------------------------------------------------------------
    // Existence check
    // -----------------------------------------------------------------------

    /// Issue the existence check and settle the armed flag.
    pub async fn mount(&mut self) {
        let Some(ticket) = self.begin_check() else {
            return;
        };
        let res = self.lifetime.run(self.api.has_alert(self.kind, self.item.item_id)).await;
        self.finish_check(ticket, res);
    }

    /// Start a check. Shows the cached value meanwhile. Signed-out viewers
    /// have no alerts, so no check is issued for them.
    pub fn begin_check(&mut self) -> Option<CheckTicket> {
        if let Some(cached) = self.cache.get(self.kind, self.item.item_id) {
            self.armed = Some(cached);
        }
        if self.session.user_id().is_none() {
            self.armed = Some(false);
            return None;
        }
        self.loading = true;
        Some(CheckTicket {
            token: self.checks.next(),
            seen_version: self.cache.version(self.kind, self.item.item_id),
        })
    }

    pub fn finish_check(&mut self, ticket: CheckTicket, res: Result<bool>) {
        if !self.checks.is_current(ticket.token) {
            return;
        }
        self.loading = false;
        match res {
            Ok(armed) => {
                if self.cache.record_check(self.kind, self.item.item_id, armed, ticket.seen_version) {
                    self.armed = Some(armed);
                } else if let Some(fresher) = self.cache.get(self.kind, self.item.item_id) {
                    self.armed = Some(fresher);
                }
            }
            Err(AppError::Cancelled) => {}
            Err(e) => {
                warn!(kind = %self.kind, item_id = %self.item.item_id, "Status check failed: {e}");
            }
        }
    }

    // -----------------------------------------------------------------------
    // User actions
    // -----------------------------------------------------------------------

    pub async fn activate(&mut self) -> ToggleOutcome {
        if self.session.user_id().is_none() {
            return ToggleOutcome::RedirectToAuth(AuthRedirect::new(self.return_to.as_deref()));
        }
        if self.loading || self.lifetime.is_ended() {
            return ToggleOutcome::Ignored;
        }
        self.error = None;

        if self.is_armed() {
            return self.disarm().await;
        }
        match self.kind {
            AlertKind::Wishlist => {
                let prefs = AlertPreferences {
                    target_price: None,
                    channels: NotifyChannels::default(),
                };
                self.arm(prefs).await
            }
            AlertKind::PriceAlert | AlertKind::StockAlert => {
                self.form = Some(PreferencesForm::new(self.kind));
                ToggleOutcome::PreferencesOpened
            }
        }
    }

    /// Submit the open preferences form.
    pub async fn confirm(&mut self) -> ToggleOutcome {
        let Some(form) = self.form.as_ref() else {
            return ToggleOutcome::Ignored;
        };
        if form.submitting || self.lifetime.is_ended() {
            return ToggleOutcome::Ignored;
        }
        let prefs = match form.validate(self.item.price) {
            Ok(p) => p,
            Err(e) => {
                let msg = e.user_message();
                if let Some(form) = self.form.as_mut() {
                    form.error = Some(msg.clone());
                }
                return ToggleOutcome::Invalid(msg);
            }
        };
        self.arm(prefs).await
    }

    pub fn cancel_form(&mut self) {
        self.form = None;
    }

    async fn arm(&mut self, prefs: AlertPreferences) -> ToggleOutcome {
        self.set_busy(true);
        self.checks.bump();

        let item_id = self.item.item_id;
        let call = async {
            match (self.kind, prefs.target_price) {
                (AlertKind::Wishlist, _) => self.api.add_to_wishlist(item_id).await,
                (AlertKind::PriceAlert, Some(target)) => {
                    self.api.set_price_alert(item_id, target, prefs.channels).await
                }
                (AlertKind::PriceAlert, None) => {
                    Err(AppError::Validation("Please enter a valid price".to_string()))
                }
                (AlertKind::StockAlert, _) => self.api.set_stock_alert(item_id, prefs.channels).await,
            }
        };
        let res = self.lifetime.run(call).await;
        self.set_busy(false);

        match res {
            Ok(()) => {
                info!(kind = %self.kind, %item_id, "Alert armed");
                self.armed = Some(true);
                self.form = None;
                self.cache.confirm(self.kind, item_id, true);
                ToggleOutcome::Armed
            }
            Err(AppError::Cancelled) => ToggleOutcome::Ignored,
            Err(e) => {
                warn!(kind = %self.kind, %item_id, "Arming alert failed: {e}");
                let msg = e.user_message();
                match self.form.as_mut() {
                    Some(form) => form.error = Some(msg.clone()),
                    None => self.error = Some(msg.clone()),
                }
                ToggleOutcome::Failed(msg)
            }
        }
    }

    async fn disarm(&mut self) -> ToggleOutcome {
        self.set_busy(true);
        self.checks.bump();

        let item_id = self.item.item_id;
        let res = self.lifetime.run(self.api.disarm(self.kind, item_id)).await;
        self.set_busy(false);

        match res {
            Ok(()) => {
                info!(kind = %self.kind, %item_id, "Alert removed");
                self.armed = Some(false);
                self.cache.confirm(self.kind, item_id, false);
                ToggleOutcome::Disarmed
            }
            Err(AppError::Cancelled) => ToggleOutcome::Ignored,
            Err(e) => {
                warn!(kind = %self.kind, %item_id, "Removing alert failed: {e}");
                let msg = e.user_message();
                self.error = Some(msg.clone());
                ToggleOutcome::Failed(msg)
            }
        }
    }

    fn set_busy(&mut self, busy: bool) {
        self.loading = busy;
        if let Some(form) = self.form.as_mut() {
            form.submitting = busy;
        }
    }

    // -----------------------------------------------------------------------
    // Cache subscription
    // -----------------------------------------------------------------------

    /// Apply a change published by another component. Returns true when the
    /// entry was invalidated and a fresh `mount` is needed.
    pub fn on_status_change(&mut self, change: &StatusChange) -> bool {
        if change.kind != self.kind || change.item_id != self.item.item_id {
            return false;
        }
        match change.armed {
            Some(armed) => {
                self.armed = Some(armed);
                false
            }
            None => true,
        }
    }

    /// Re-read the cache. Returns true when nothing is cached any more.
    pub fn sync_from_cache(&mut self) -> bool {
        match self.cache.get(self.kind, self.item.item_id) {
            Some(armed) => {
                self.armed = Some(armed);
                false
            }
            None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
