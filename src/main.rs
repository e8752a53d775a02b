use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use hoard_valley::alerts::list::{ListView, PageOutcome, RemoveOutcome};
use hoard_valley::alerts::saved_search::SavedSearchOutcome;
use hoard_valley::alerts::{
    AlertToggle, PriceAlertsPage, SavedSearchAlertsPage, StockAlertsPage, ToggleOutcome, WishlistPage,
};
use hoard_valley::config::Config;
use hoard_valley::paging::{BidHistory, ItemReviewList, PageLoad, PageSource, PagedList, SellerReviewList};
use hoard_valley::price_history::PriceHistory;
use hoard_valley::push::{Notification, PushPayload};
use hoard_valley::reviews::RatingSummary;
use hoard_valley::stock::{StockControl, StockOutcome};
use hoard_valley::types::{AlertFrequency, AlertKind, ItemContext, NotifyChannels, StockStatus};
use hoard_valley::{AppError, ClientContext, Result};

#[derive(Parser, Debug)]
#[command(name = "hoard")]
#[command(about = "Hoard Valley alerts and listings from the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List wishlist entries, optionally removing one by row id
    Wishlist {
        #[arg(long)]
        remove: Option<Uuid>,
    },
    /// List price alerts, optionally removing one by row id
    PriceAlerts {
        #[arg(long)]
        remove: Option<Uuid>,
    },
    /// List stock alerts, optionally removing one by row id
    StockAlerts {
        #[arg(long)]
        remove: Option<Uuid>,
    },
    /// List saved searches, optionally switching one's alert on or off
    SavedSearches {
        #[arg(long, conflicts_with = "disable")]
        enable: Option<Uuid>,
        #[arg(long)]
        disable: Option<Uuid>,
        #[arg(long, value_enum, default_value_t = Frequency::Daily)]
        frequency: Frequency,
    },
    /// Page through reviews of an item (or of a seller with --seller)
    Reviews {
        id: Uuid,
        #[arg(long)]
        seller: bool,
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Page through the bid history of an item
    Bids {
        item: Uuid,
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Show the price history of an item
    History { item: Uuid },
    /// Get notified when an out-of-stock item is back
    NotifyStock {
        item: Uuid,
        #[arg(long)]
        no_email: bool,
        #[arg(long)]
        no_push: bool,
    },
    /// Change the stock status of one of your own listings
    SetStock {
        item: Uuid,
        #[arg(value_enum)]
        status: Status,
    },
    /// Render a push payload as the notification it would show
    Push { json: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Frequency {
    Instant,
    Daily,
    Weekly,
}

impl From<Frequency> for AlertFrequency {
    fn from(f: Frequency) -> Self {
        match f {
            Frequency::Instant => AlertFrequency::Instant,
            Frequency::Daily => AlertFrequency::Daily,
            Frequency::Weekly => AlertFrequency::Weekly,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Status {
    InStock,
    LowStock,
    OutOfStock,
}

impl From<Status> for StockStatus {
    fn from(s: Status) -> Self {
        match s {
            Status::InStock => StockStatus::InStock,
            Status::LowStock => StockStatus::LowStock,
            Status::OutOfStock => StockStatus::OutOfStock,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg, cli.command).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config, command: Command) -> Result<()> {
    let ctx = ClientContext::connect(&cfg)?;

    match command {
        Command::Wishlist { remove } => {
            let mut page = WishlistPage::new(&ctx);
            settle_list(page.load().await)?;
            if let Some(row) = remove {
                report_removal(page.remove(row).await);
            }
            match page.view() {
                ListView::Populated(rows) => {
                    for r in rows {
                        info!(row_id = %r.id, item_id = %r.item_id, "{} | ${:.2}", r.title, r.price);
                    }
                }
                view => report_view(&view),
            }
        }
        Command::PriceAlerts { remove } => {
            let mut page = PriceAlertsPage::new(&ctx);
            settle_list(page.load().await)?;
            if let Some(row) = remove {
                report_removal(page.remove(row).await);
            }
            match page.view() {
                ListView::Populated(rows) => {
                    for r in rows {
                        info!(
                            row_id = %r.alert.id,
                            item_id = %r.alert.item_id,
                            "{} | now ${:.2} | alert at ${:.2}",
                            r.title, r.price, r.target_price,
                        );
                    }
                }
                view => report_view(&view),
            }
        }
        Command::StockAlerts { remove } => {
            let mut page = StockAlertsPage::new(&ctx);
            settle_list(page.load().await)?;
            if let Some(row) = remove {
                report_removal(page.remove(row).await);
            }
            match page.view() {
                ListView::Populated(rows) => {
                    for r in rows {
                        info!(
                            row_id = %r.alert.id,
                            item_id = %r.alert.item_id,
                            "{} | {} | email={} push={}",
                            r.title, r.stock_status, r.alert.notify_email, r.alert.notify_push,
                        );
                    }
                }
                view => report_view(&view),
            }
        }
        Command::SavedSearches { enable, disable, frequency } => {
            let mut page = SavedSearchAlertsPage::new(&ctx);
            page.load().await.map_err(|_| AppError::Unauthenticated)?;
            let change = enable.map(|id| (id, true)).or(disable.map(|id| (id, false)));
            if let Some((id, enabled)) = change {
                match page.set_alert(id, enabled, frequency.into()).await {
                    SavedSearchOutcome::Updated => info!(search_id = %id, enabled, "Saved search alert updated"),
                    SavedSearchOutcome::NotFound => warn!(search_id = %id, "No such saved search"),
                    other => warn!(search_id = %id, "Saved search alert not changed: {other:?}"),
                }
            }
            match page.view() {
                ListView::Populated(rows) => {
                    for s in rows {
                        info!(
                            search_id = %s.id,
                            "{} | \"{}\" | alerts {} ({})",
                            s.name,
                            s.query,
                            if s.alert_enabled { "on" } else { "off" },
                            s.alert_frequency,
                        );
                    }
                }
                view => report_view(&view),
            }
        }
        Command::Reviews { id, seller, pages } => {
            let records = if seller {
                let mut list = SellerReviewList::new(&ctx, cfg.reviews_page_size);
                page_through(&mut list, id, pages).await;
                list.records().to_vec()
            } else {
                let mut list = ItemReviewList::new(&ctx, cfg.reviews_page_size);
                page_through(&mut list, id, pages).await;
                list.records().to_vec()
            };
            for r in &records {
                info!(
                    author = %r.author.username,
                    "{}★ {}",
                    r.rating,
                    r.review_text.as_deref().unwrap_or(""),
                );
            }
            match RatingSummary::from_reviews(&records) {
                Some(s) => info!("Average {:.1} from {} reviews", s.average, s.count),
                None => info!("No reviews yet"),
            }
        }
        Command::Bids { item, pages } => {
            let mut list = BidHistory::new(&ctx, cfg.bids_page_size);
            page_through(&mut list, item, pages).await;
            for b in list.records() {
                info!(bidder = %b.bidder.username, at = %b.created_at, "${:.2}", b.amount);
            }
            if list.has_more() {
                info!("More bids available, pass --pages to see them");
            }
        }
        Command::History { item } => {
            let history = PriceHistory::load(&ctx.api, item).await?;
            if history.is_empty() {
                info!(%item, "No price changes recorded");
            }
            for p in history.points() {
                info!(at = %p.changed_at, "${:.2} -> ${:.2}", p.old_price, p.new_price);
            }
            if let (Some(lo), Some(hi)) = (history.lowest(), history.highest()) {
                info!("Lowest ${lo:.2} | highest ${hi:.2}");
            }
            if let Some(pct) = history.change_percent() {
                info!("Overall change {pct:+.1}%");
            }
        }
        Command::NotifyStock { item, no_email, no_push } => {
            let listing = ItemContext {
                item_id: item,
                seller_id: None,
                price: 0.0,
                stock_status: StockStatus::OutOfStock,
            };
            let mut toggle = AlertToggle::new(AlertKind::StockAlert, listing, &ctx);
            toggle.mount().await;
            if toggle.is_armed() {
                info!(%item, "{}", toggle.label());
                return Ok(());
            }
            let outcome = match toggle.activate().await {
                ToggleOutcome::PreferencesOpened => {
                    if let Some(form) = toggle.form_mut() {
                        form.channels = NotifyChannels { email: !no_email, push: !no_push };
                    }
                    toggle.confirm().await
                }
                other => other,
            };
            match outcome {
                ToggleOutcome::Armed => info!(%item, "{}", toggle.label()),
                ToggleOutcome::RedirectToAuth(r) => return Err(redirect_error(&r.path)),
                ToggleOutcome::Invalid(msg) | ToggleOutcome::Failed(msg) => {
                    return Err(AppError::Validation(msg))
                }
                other => warn!(%item, "Stock alert not set: {other:?}"),
            }
        }
        Command::SetStock { item, status } => {
            let target: StockStatus = status.into();
            // The current status is not fetched; seed the opposite so the
            // update is always sent.
            let assumed = if target == StockStatus::InStock {
                StockStatus::OutOfStock
            } else {
                StockStatus::InStock
            };
            let listing = ItemContext {
                item_id: item,
                seller_id: ctx.session.user_id(),
                price: 0.0,
                stock_status: assumed,
            };
            let mut control = StockControl::new(listing, &ctx);
            match control.set_status(target).await {
                StockOutcome::Updated(s) => info!(%item, status = %s, "Stock status changed"),
                StockOutcome::RedirectToAuth(r) => return Err(redirect_error(&r.path)),
                StockOutcome::Forbidden(msg) => return Err(AppError::Forbidden(msg)),
                StockOutcome::Failed(msg) => return Err(AppError::Validation(msg)),
                other => warn!(%item, "Stock status not changed: {other:?}"),
            }
        }
        Command::Push { json } => {
            let n = Notification::from(PushPayload::parse(&json));
            info!(icon = %n.icon, badge = %n.badge, url = %n.url, "{}: {}", n.title, n.body);
        }
    }

    if let Some(latency) = ctx.latency() {
        if let (Some(p50), Some(p95), Some(p99)) = latency.percentiles() {
            info!(p50_us = p50, p95_us = p95, p99_us = p99, failures = latency.failures(), "RPC latency");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn settle_list(outcome: PageOutcome) -> Result<()> {
    match outcome {
        PageOutcome::RedirectToAuth(r) => Err(redirect_error(&r.path)),
        PageOutcome::Loaded(n) => {
            info!("Loaded {n} rows");
            Ok(())
        }
        PageOutcome::Failed(_) | PageOutcome::Discarded => Ok(()),
    }
}

fn report_view<R>(view: &ListView<'_, R>) {
    match view {
        ListView::Loading => info!("Still loading"),
        ListView::Error(msg) => warn!("{msg}"),
        ListView::Empty => info!("Nothing here yet"),
        ListView::Populated(rows) => info!("{} rows", rows.len()),
    }
}

fn report_removal(outcome: RemoveOutcome) {
    match outcome {
        RemoveOutcome::Removed => info!("Removed"),
        RemoveOutcome::NotFound => warn!("No row with that id"),
        RemoveOutcome::Failed(msg) => warn!("Remove failed: {msg}"),
        RemoveOutcome::Ignored => {}
    }
}

/// Keep loading until `pages` pages are in or the list runs out.
async fn page_through<S: PageSource>(list: &mut PagedList<S>, subject: Uuid, pages: u32) {
    let mut last = list.show(subject, 0).await;
    for _ in 1..pages {
        if !list.has_more() {
            break;
        }
        last = list.load_more().await;
    }
    if let PageLoad::Failed(msg) = last {
        warn!("{msg}");
    }
}

fn redirect_error(path: &str) -> AppError {
    warn!("Sign in first (HOARD_USER_ID and HOARD_ACCESS_TOKEN), see {path}");
    AppError::Unauthenticated
}
