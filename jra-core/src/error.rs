//! Structured error types for collection runs.
//!
//! These are designed to be displayable as a single line at the CLI edge.

use std::path::PathBuf;
use thiserror::Error;

use crate::data::provider::FetchError;

/// Errors from a collection run.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Bad configuration. Raised before any fetch or file write.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("transport error for {url}: {cause}")]
    Transport { url: String, cause: String },

    #[error("failed to persist {}: {cause}", path.display())]
    Persistence { path: PathBuf, cause: String },

    #[error("summary manifest error: {0}")]
    Manifest(String),

    /// A runtime resource (worker pool, HTTP client) could not be set up.
    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("collection interrupted")]
    Interrupted,
}

impl CollectError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, cause: impl ToString) -> Self {
        Self::Persistence {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    /// Transport failures are the only per-cell errors a `Skip` policy may absorb.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<FetchError> for CollectError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Status { url, status } => Self::Transport {
                url,
                cause: format!("HTTP {status}"),
            },
            FetchError::Connection { url, cause } => Self::Transport { url, cause },
            FetchError::Client(cause) => {
                Self::Runtime(format!("failed to build HTTP client: {cause}"))
            }
        }
    }
}

/// Errors from loading settings or a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {cause}", path.display())]
    Io { path: PathBuf, cause: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

impl From<ConfigError> for CollectError {
    fn from(e: ConfigError) -> Self {
        Self::Validation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_maps_to_transport() {
        let err: CollectError = FetchError::Status {
            url: "https://example.com/x".into(),
            status: 503,
        }
        .into();
        assert!(err.is_transport());
        assert_eq!(
            err.to_string(),
            "transport error for https://example.com/x: HTTP 503"
        );
    }

    #[test]
    fn client_build_failure_is_not_a_transport_error() {
        let err: CollectError = FetchError::Client("no TLS backend".into()).into();
        assert!(matches!(err, CollectError::Runtime(_)));
        assert!(!err.is_transport());
        assert_eq!(
            err.to_string(),
            "runtime error: failed to build HTTP client: no TLS backend"
        );
    }

    #[test]
    fn persistence_message_names_path() {
        let err = CollectError::persistence("data/race_results_2020.csv", "disk full");
        assert!(!err.is_transport());
        assert!(err.to_string().contains("race_results_2020.csv"));
    }
}
