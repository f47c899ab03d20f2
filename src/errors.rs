//! Unified error types for `PickupBuddy`.
//!
//! Schedule computation itself never fails: unknown plans or missing anchors
//! degrade to "no schedule". Errors only surface at the edges, when reading or
//! writing subscription records and when loading configuration.

use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// No subscription record exists for the given user
    #[error("Subscription not found for user: {user_id}")]
    SubscriptionNotFound {
        /// Opaque user identifier
        user_id: String,
    },

    /// A stored override slot failed validation at the read boundary
    #[error("Invalid override in slot {slot}: {message}")]
    InvalidOverride {
        /// Zero-based slot index
        slot: usize,
        /// Validation failure
        message: String,
    },

    /// A persistence write did not go through
    #[error("Persistence failure: {message}")]
    Persistence {
        /// What went wrong
        message: String,
    },

    /// Database error from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Override slot document could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the error came from the storage layer rather than from bad data.
    #[must_use]
    pub const fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. } | Self::Database(_))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
