pub mod core;
pub mod emails;
pub mod export;
pub mod jobs;
pub mod scraping;

// --- Primary core exports ---
pub use crate::core::types;
pub use crate::core::AppState;
pub use crate::scraping::search_loop::{RunConfig, SearchScraper};
pub use crate::scraping::{ControlSignals, ScrapeError};
