//! Fetch trait, fetch errors, and progress reporting.
//!
//! The `Fetch` trait abstracts over transports (throttled HTTP, offline
//! placeholder, test stubs) so collectors never know where bodies come from.

use thiserror::Error;

use crate::category::CategoryKind;

/// Transport-level failure. Never retried by the fetcher itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {cause}")]
    Connection { url: String, cause: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Anything that can turn a URL and query parameters into a response body.
pub trait Fetch: Send + Sync {
    /// Human-readable name of this transport.
    fn name(&self) -> &str;

    /// Fetch the raw body for `url` with `query` appended.
    fn fetch(&self, url: &str, query: &[(&str, &str)]) -> Result<String, FetchError>;
}

/// Transport that performs no network I/O and returns an empty body.
///
/// Used for `--offline` runs, where every collector falls back to its
/// empty placeholder table.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineFetcher;

impl Fetch for OfflineFetcher {
    fn name(&self) -> &str {
        "offline"
    }

    fn fetch(&self, url: &str, _query: &[(&str, &str)]) -> Result<String, FetchError> {
        tracing::debug!(url, "offline: skipping request");
        Ok(String::new())
    }
}

/// Progress callback for multi-cell collection runs.
pub trait CollectProgress: Send + Sync {
    /// Called when a run starts.
    fn on_start(&self, start_year: i32, end_year: i32, total_cells: usize);

    /// Called when one cell completes, successfully or not.
    fn on_cell(&self, category: CategoryKind, year: i32, result: Result<usize, &str>);

    /// Called when the whole run is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that emits tracing events.
pub struct LogProgress;

impl CollectProgress for LogProgress {
    fn on_start(&self, start_year: i32, end_year: i32, total_cells: usize) {
        tracing::info!(
            "Starting JRA data collection from {start_year} to {end_year} ({total_cells} cells)"
        );
    }

    fn on_cell(&self, category: CategoryKind, year: i32, result: Result<usize, &str>) {
        match result {
            Ok(rows) => tracing::info!(%category, year, rows, "collected"),
            Err(e) => tracing::warn!(%category, year, error = e, "skipped"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        tracing::info!("Collection complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}

/// Progress reporter that does nothing.
pub struct NoProgress;

impl CollectProgress for NoProgress {
    fn on_start(&self, _start_year: i32, _end_year: i32, _total_cells: usize) {}
    fn on_cell(&self, _category: CategoryKind, _year: i32, _result: Result<usize, &str>) {}
    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_fetcher_returns_empty_body() {
        let body = OfflineFetcher
            .fetch("https://api.example.com/race_results", &[("year", "2020")])
            .unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn fetch_error_display() {
        let err = FetchError::Connection {
            url: "https://api.example.com".into(),
            cause: "dns failure".into(),
        };
        assert_eq!(
            err.to_string(),
            "request to https://api.example.com failed: dns failure"
        );
    }
}
