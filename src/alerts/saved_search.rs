use tracing::{info, warn};
use uuid::Uuid;

use crate::alerts::list::ListView;
use crate::context::ClientContext;
use crate::error::AppError;
use crate::rpc::Api;
use crate::session::{AuthRedirect, SessionHandle};
use crate::sync::{Generation, Lifetime};
use crate::types::{AlertFrequency, SavedSearch};

#[derive(Debug, Clone, PartialEq)]
pub enum SavedSearchOutcome {
    Updated,
    NotFound,
    RedirectToAuth(AuthRedirect),
    Failed(String),
    Ignored,
}

/// Saved searches with their new-listing alerts.
/// Unlike the per-item alert pages, toggling keeps the row and patches it.
pub struct SavedSearchAlertsPage {
    api: Api,
    session: SessionHandle,
    searches: Vec<SavedSearch>,
    loading: bool,
    error: Option<String>,
    loads: Generation,
    lifetime: Lifetime,
    /// User whose searches are currently held.
    loaded_for: Option<Uuid>,
    /// Identity the latest load was issued for.
    requested_for: Option<Option<Uuid>>,
}

impl SavedSearchAlertsPage {
    pub fn new(ctx: &ClientContext) -> Self {
        Self {
            api: ctx.api.clone(),
            session: ctx.session.clone(),
            searches: Vec::new(),
            loading: false,
            error: None,
            loads: Generation::new(),
            lifetime: Lifetime::new(),
            loaded_for: None,
            requested_for: None,
        }
    }

    pub fn view(&self) -> ListView<'_, SavedSearch> {
        if self.loading {
            ListView::Loading
        } else if self.searches.is_empty() {
            match &self.error {
                Some(e) => ListView::Error(e),
                None => ListView::Empty,
            }
        } else {
            ListView::Populated(&self.searches)
        }
    }

    pub fn searches(&self) -> &[SavedSearch] {
        &self.searches
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn alerting_count(&self) -> usize {
        self.searches.iter().filter(|s| s.alert_enabled).count()
    }

    pub async fn load(&mut self) -> Result<usize, AuthRedirect> {
        self.requested_for = Some(self.session.user_id());
        let Some(user) = self.session.user_id() else {
            self.loads.bump();
            self.searches.clear();
            self.loading = false;
            self.loaded_for = None;
            return Err(AuthRedirect::default());
        };
        if self.loaded_for != Some(user) {
            self.searches.clear();
        }
        let token = self.loads.next();
        self.loading = true;
        self.error = None;

        let res = self.lifetime.run(self.api.get_saved_searches_with_alerts()).await;
        if !self.loads.is_current(token) {
            return Ok(self.searches.len());
        }
        self.loading = false;
        match res {
            Ok(rows) => {
                self.searches = rows;
                self.loaded_for = Some(user);
            }
            Err(AppError::Cancelled) => {}
            Err(e) => {
                warn!("Loading saved searches failed: {e}");
                self.searches.clear();
                self.error = Some(e.user_message());
            }
        }
        Ok(self.searches.len())
    }

    /// Reload when the signed-in user differs from the one displayed.
    pub async fn sync_identity(&mut self) -> Option<Result<usize, AuthRedirect>> {
        if self.requested_for == Some(self.session.user_id()) {
            return None;
        }
        Some(self.load().await)
    }

    pub async fn set_alert(
        &mut self,
        search_id: Uuid,
        enabled: bool,
        frequency: AlertFrequency,
    ) -> SavedSearchOutcome {
        let Some(user) = self.session.user_id() else {
            return SavedSearchOutcome::RedirectToAuth(AuthRedirect::default());
        };
        // Rows held for another user are not addressable.
        if self.loaded_for != Some(user) || !self.searches.iter().any(|s| s.id == search_id) {
            return SavedSearchOutcome::NotFound;
        }

        let res = self
            .lifetime
            .run(self.api.toggle_saved_search_alert(search_id, enabled, frequency))
            .await;
        match res {
            Ok(()) => {
                if let Some(search) = self.searches.iter_mut().find(|s| s.id == search_id) {
                    search.alert_enabled = enabled;
                    search.alert_frequency = frequency;
                }
                info!(%search_id, enabled, %frequency, "Saved search alert updated");
                self.error = None;
                SavedSearchOutcome::Updated
            }
            Err(AppError::Cancelled) => SavedSearchOutcome::Ignored,
            Err(e) => {
                warn!(%search_id, "Updating saved search alert failed: {e}");
                let msg = e.user_message();
                self.error = Some(msg.clone());
                SavedSearchOutcome::Failed(msg)
            }
        }
    }
}
