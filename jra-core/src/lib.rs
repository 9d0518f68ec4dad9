//! JRA Core: year-ranged collection of racing data into per-year CSV files.
//!
//! This crate contains:
//! - The four data categories and their fixed column schemas
//! - Environment settings and the validated collection config
//! - A throttled HTTP transport behind the `Fetch` trait
//! - Per-category collectors (row extraction still a placeholder)
//! - Atomic per-cell CSV persistence
//! - The collection orchestrator and the filesystem-derived summary manifest

pub mod category;
pub mod config;
pub mod data;
pub mod dataset;
pub mod error;
pub mod orchestrator;
pub mod settings;

pub use category::CategoryKind;
pub use config::{CollectionConfig, FailurePolicy, DATA_START_YEAR};
pub use dataset::YearlyDataset;
pub use error::{CollectError, ConfigError};
pub use orchestrator::{CollectedData, CollectionOrchestrator, CollectionReport, SkippedCell};
pub use settings::Settings;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn orchestrator_is_send_sync() {
        assert_send::<CollectionOrchestrator>();
        assert_sync::<CollectionOrchestrator>();
    }

    #[test]
    fn transport_types_are_send_sync() {
        assert_send::<data::RateLimitedFetcher>();
        assert_sync::<data::RateLimitedFetcher>();
        assert_send::<data::Throttle>();
        assert_sync::<data::Throttle>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<CollectionConfig>();
        assert_sync::<CollectionConfig>();
        assert_send::<YearlyDataset>();
        assert_sync::<YearlyDataset>();
    }
}
