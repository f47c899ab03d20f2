/// Database connection and table creation
pub mod database;

/// Application settings from `pickup.toml` and the environment
pub mod settings;
