//! Serializable collection configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::category::CategoryKind;
use crate::error::{CollectError, ConfigError};
use crate::settings::Settings;

/// First year the public data source covers.
pub const DATA_START_YEAR: i32 = 1986;

/// What to do when a single (category, year) cell fails with a transport error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the whole run on the first error.
    #[default]
    Abort,
    /// Log the failed cell, leave it off disk, and continue.
    Skip,
}

/// Everything one collection run needs. Built once, never mutated during the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub start_year: i32,
    pub end_year: i32,

    /// Requested categories. Collected in declaration order whatever the input order.
    #[serde(default = "all_categories")]
    pub categories: BTreeSet<CategoryKind>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Base throttling delay in seconds.
    #[serde(default = "default_delay")]
    pub request_delay_base: f64,

    /// Multiplier range for the base delay: `base * uniform(low, high)`.
    #[serde(default = "default_jitter")]
    pub request_delay_jitter: (f64, f64),

    /// Write each cell to `{output_dir}/{prefix}_{year}.csv`.
    #[serde(default = "default_true")]
    pub persist: bool,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Worker threads over the year dimension. 1 = sequential.
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn all_categories() -> BTreeSet<CategoryKind> {
    CategoryKind::ALL.into_iter().collect()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(crate::settings::DEFAULT_DATA_DIR)
}

fn default_delay() -> f64 {
    crate::settings::DEFAULT_REQUEST_DELAY
}

fn default_jitter() -> (f64, f64) {
    (0.5, 1.5)
}

fn default_true() -> bool {
    true
}

fn default_workers() -> usize {
    1
}

fn default_timeout_secs() -> u64 {
    30
}

fn read_config(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        cause: e.to_string(),
    })
}

impl CollectionConfig {
    /// A config for `[start_year, end_year]` with every other field at its default.
    pub fn new(start_year: i32, end_year: i32) -> Self {
        Self {
            start_year,
            end_year,
            categories: all_categories(),
            output_dir: default_output_dir(),
            request_delay_base: default_delay(),
            request_delay_jitter: default_jitter(),
            persist: true,
            failure_policy: FailurePolicy::default(),
            workers: default_workers(),
            request_timeout_secs: default_timeout_secs(),
        }
    }

    /// Seed output directory and delay from environment settings.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.output_dir = settings.data_dir.clone();
        self.request_delay_base = settings.request_delay;
        self
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = CategoryKind>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml(&read_config(path)?)
    }

    /// Parse TOML, taking `output_dir` and `request_delay_base` from
    /// `settings` when the document leaves them out.
    pub fn from_toml_with_settings(s: &str, settings: &Settings) -> Result<Self, ConfigError> {
        let mut table: toml::Table =
            toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        table.entry("output_dir").or_insert_with(|| {
            toml::Value::String(settings.data_dir.to_string_lossy().into_owned())
        });
        table
            .entry("request_delay_base")
            .or_insert(toml::Value::Float(settings.request_delay));
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file_with_settings(path: &Path, settings: &Settings) -> Result<Self, ConfigError> {
        Self::from_toml_with_settings(&read_config(path)?, settings)
    }

    /// Check every invariant. Must pass before any fetch or file write.
    pub fn validate(&self) -> Result<(), CollectError> {
        if self.start_year < DATA_START_YEAR {
            return Err(CollectError::Validation(format!(
                "start year {} is before {DATA_START_YEAR}, the first year with data",
                self.start_year
            )));
        }
        if self.end_year < self.start_year {
            return Err(CollectError::Validation(format!(
                "end year {} is before start year {}",
                self.end_year, self.start_year
            )));
        }
        if !self.request_delay_base.is_finite() || self.request_delay_base < 0.0 {
            return Err(CollectError::Validation(format!(
                "request delay must be a non-negative number of seconds, got {}",
                self.request_delay_base
            )));
        }
        let (low, high) = self.request_delay_jitter;
        if !(low.is_finite() && high.is_finite() && 0.0 <= low && low <= high) {
            return Err(CollectError::Validation(format!(
                "jitter range must satisfy 0 <= low <= high, got ({low}, {high})"
            )));
        }
        if self.workers == 0 {
            return Err(CollectError::Validation("workers must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(CollectError::Validation(
                "request timeout must be at least 1 second".into(),
            ));
        }
        Ok(())
    }

    /// Years in the range, inclusive.
    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start_year..=self.end_year
    }

    pub fn year_count(&self) -> usize {
        if self.end_year < self.start_year {
            0
        } else {
            (self.end_year - self.start_year + 1) as usize
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `{output_dir}/data_summary.json`
    pub fn default_summary_path(&self) -> PathBuf {
        self.output_dir.join(crate::data::manifest::SUMMARY_FILE_NAME)
    }
}
