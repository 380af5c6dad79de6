//! Error types for the data layer.
//!
//! Connection-time failures surface as [`DbError`]. Once connected, the
//! store speaks the session's [`StoreError`](trisolaris_core::StoreError)
//! so a Dragonfly hiccup looks like any other persistence fault.

/// Errors that can occur while setting up the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
