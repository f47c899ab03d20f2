//! Application settings.
//!
//! Settings are read from `pickup.toml` when present and then overridden by
//! environment variables (`DATABASE_URL`, `PICKUP_UTC_OFFSET_MINUTES`), which
//! may themselves come from a `.env` file.

use crate::errors::{Error, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Default settings file location
pub const DEFAULT_SETTINGS_PATH: &str = "pickup.toml";

const DEFAULT_DATABASE_URL: &str = "sqlite://data/pickup_buddy.sqlite?mode=rwc";

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `SeaORM` connection URL
    pub database_url: String,
    /// Offset of the service area from UTC, in minutes. Weekday and month
    /// rules are evaluated on this calendar.
    pub utc_offset_minutes: i32,
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            utc_offset_minutes: 0,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Parses settings from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse settings: {e}"),
        })
    }

    /// Applies `DATABASE_URL` and `PICKUP_UTC_OFFSET_MINUTES` when set.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database_url = url;
        }
        if let Ok(offset) = std::env::var("PICKUP_UTC_OFFSET_MINUTES") {
            self.utc_offset_minutes = offset.trim().parse().map_err(|e| Error::Config {
                message: format!("PICKUP_UTC_OFFSET_MINUTES is not a number: {e}"),
            })?;
        }
        Ok(self)
    }

    /// The service-area calendar offset.
    pub fn service_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).ok_or_else(|| {
            Error::Config {
                message: format!(
                    "utc_offset_minutes out of range: {}",
                    self.utc_offset_minutes
                ),
            }
        })
    }
}

/// Loads settings from `path`, falling back to defaults when the file is absent.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    let settings = if path.exists() {
        debug!("Loading settings from {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("Failed to read settings file {}: {e}", path.display()),
        })?;
        Settings::from_toml(&contents)?
    } else {
        debug!("No settings file at {}, using defaults", path.display());
        Settings::default()
    };
    settings.apply_env()
}
