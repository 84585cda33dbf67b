//! Error types for the allocator and its collaborators

use crate::types::PortfolioKind;

/// Errors raised outside the allocation core.
///
/// The weight arithmetic itself never fails; these cover configuration,
/// strict manual overrides, and the I/O collaborators around the core.
#[derive(Debug, thiserror::Error)]
pub enum AllocatorError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown ticker {ticker} in {portfolio} portfolio")]
    UnknownTicker {
        portfolio: PortfolioKind,
        ticker: String,
    },

    #[error("Feed {url} failed: {message}")]
    Feed { url: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Journal I/O failed: {0}")]
    Journal(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for allocator operations
pub type Result<T> = std::result::Result<T, AllocatorError>;
