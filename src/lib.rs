pub mod alerts;
pub mod carousel;
pub mod config;
pub mod context;
pub mod error;
pub mod highlight;
pub mod paging;
pub mod price_history;
pub mod push;
pub mod recommendations;
pub mod reviews;
pub mod rpc;
pub mod session;
pub mod stock;
pub mod sync;
pub mod types;

pub use context::ClientContext;
pub use error::{AppError, Result};
