//! Environment-sourced settings.
//!
//! Read once at startup and passed by value; nothing here is global.

use std::path::PathBuf;

use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "https://api.example.com";
pub const DEFAULT_LOG_LEVEL: &str = "INFO";
pub const DEFAULT_REQUEST_DELAY: f64 = 1.0;
pub const DEFAULT_DATA_DIR: &str = "data";

/// Settings from the process environment (or a `.env` file loaded by the binary).
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// `API_KEY`
    pub api_key: String,
    /// `API_URL`
    pub api_url: String,
    /// `DEBUG`
    pub debug: bool,
    /// `LOG_LEVEL`
    pub log_level: String,
    /// `JRA_REQUEST_DELAY`, seconds.
    pub request_delay: f64,
    /// `JRA_DATA_DIR`
    pub data_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            debug: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            request_delay: DEFAULT_REQUEST_DELAY,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Missing keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let request_delay = match lookup("JRA_REQUEST_DELAY") {
            None => defaults.request_delay,
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => v,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "JRA_REQUEST_DELAY".into(),
                        value: raw,
                    })
                }
            },
        };

        Ok(Self {
            api_key: lookup("API_KEY").unwrap_or(defaults.api_key),
            api_url: lookup("API_URL").unwrap_or(defaults.api_url),
            debug: lookup("DEBUG").map_or(defaults.debug, |v| parse_flag(&v)),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            request_delay,
            data_dir: lookup("JRA_DATA_DIR").map_or(defaults.data_dir, PathBuf::from),
        })
    }

    /// Effective log filter directive: `debug` when DEBUG is on, else LOG_LEVEL.
    ///
    /// Accepts the `WARNING`/`CRITICAL` spellings as aliases for `warn`/`error`.
    pub fn log_filter(&self) -> String {
        if self.debug {
            return "debug".to_string();
        }
        match self.log_level.trim().to_ascii_lowercase().as_str() {
            "warning" => "warn".to_string(),
            "critical" | "fatal" => "error".to_string(),
            other => other.to_string(),
        }
    }
}

/// "true", "1" and "t" (any case) are on; everything else is off.
fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "t")
}
