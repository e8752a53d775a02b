pub mod list;
pub mod saved_search;
pub mod toggle;

pub use list::{AlertListPage, ListView, PriceAlertsPage, StockAlertsPage, WishlistPage};
pub use saved_search::SavedSearchAlertsPage;
pub use toggle::{AlertToggle, ToggleOutcome, ToggleState};
