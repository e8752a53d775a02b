pub mod generation;
pub mod lifetime;
pub mod status_cache;

pub use generation::{Generation, RequestToken};
pub use lifetime::Lifetime;
pub use status_cache::{StatusCache, StatusChange};
