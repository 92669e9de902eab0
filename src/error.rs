// src/error.rs

//! Unified error handling for the mirror.

use std::fmt;

use thiserror::Error;

/// Result type alias for mirror operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Feed item could not be turned into an entry (skipped, never fatal)
    #[error("Malformed feed entry {}: {reason}", .id.as_deref().unwrap_or("<no id>"))]
    MalformedEntry { id: Option<String>, reason: String },

    /// Network, DNS or timeout failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The bearer credential was rejected
    #[error("Access token expired or rejected")]
    AuthExpired,

    /// The refresh exchange itself failed
    #[error("Token refresh failed: {0}")]
    AuthRefreshFailed(String),

    /// The remote sink refused the request
    #[error("Remote rejected request ({status}): {message}")]
    SinkRejected { status: u16, message: String },

    /// The remote sink failed on its side (5xx)
    #[error("Remote server error ({status}): {message}")]
    Unavailable { status: u16, message: String },

    /// The remote sink asked us to slow down
    #[error("Rate limited by remote{}", .retry_after.map(|s| format!(" (retry after {s}s)")).unwrap_or_default())]
    RateLimited { retry_after: Option<u64> },

    /// Feed could not be fetched or parsed
    #[error("Feed error: {0}")]
    Feed(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a malformed-entry error.
    pub fn malformed(id: Option<&str>, reason: impl Into<String>) -> Self {
        Self::MalformedEntry {
            id: id.map(str::to_string),
            reason: reason.into(),
        }
    }

    /// Create a sink rejection error.
    pub fn rejected(status: u16, message: impl fmt::Display) -> Self {
        Self::SinkRejected {
            status,
            message: message.to_string(),
        }
    }

    /// Create a feed error.
    pub fn feed(message: impl fmt::Display) -> Self {
        Self::Feed(message.to_string())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether this error must end the run.
    ///
    /// Only malformed entries are local; everything else unwinds to the run boundary.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MalformedEntry { .. })
    }
}
