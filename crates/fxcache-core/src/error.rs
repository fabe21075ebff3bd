//! Error types for fxcache-core

use thiserror::Error;

/// Errors raised inside the rate pipeline.
///
/// None of these reach the UI as hard failures: the cache and the conversion
/// engine recover from them by walking the degradation chain.
#[derive(Error, Debug)]
pub enum FxError {
    #[error("Rate provider failed: {0}")]
    Provider(String),

    #[error("All rate sources unavailable (primary: {primary}; fallback: {fallback})")]
    SourceUnavailable { primary: String, fallback: String },

    #[error("Exchange rate not found for {0}")]
    RateNotFound(String),

    #[error("Stored rate snapshot is corrupt: {0}")]
    StorageCorrupt(String),

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result alias for fxcache-core operations
pub type Result<T> = std::result::Result<T, FxError>;
