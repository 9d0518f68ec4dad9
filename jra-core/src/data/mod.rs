//! Fetching, per-category collection, CSV persistence, and the summary manifest.

pub mod collector;
pub mod http;
pub mod manifest;
pub mod provider;
pub mod store;
pub mod throttle;

pub use collector::{Collector, CollectorSet};
pub use http::RateLimitedFetcher;
pub use manifest::{SummaryManifest, SUMMARY_FILE_NAME};
pub use provider::{CollectProgress, Fetch, FetchError, LogProgress, NoProgress, OfflineFetcher};
pub use store::CsvStore;
pub use throttle::Throttle;
