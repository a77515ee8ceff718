// src/error.rs

//! Unified error handling for the harvester.

use std::fmt;

use thiserror::Error;

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed at the transport level
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Regular expression failed to compile
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Timeout, refused connection, reset
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// Origin answered with 403, 429 or 5xx
    #[error("Blocked response from {url}: HTTP {status}")]
    Blocked { url: String, status: u16 },

    /// Any other non-success status
    #[error("Unexpected status from {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    /// Every fetch path was exhausted
    #[error("Fetch failed for {url}: {last_error}")]
    FetchFailed { url: String, last_error: String },

    /// A page could not be turned into a draw record
    #[error("Extraction skipped for {url}: {message}")]
    Extraction { url: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Link discovery error
    #[error("Discovery error: {0}")]
    Discovery(String),
}

impl AppError {
    /// Create a network error for a URL.
    pub fn network(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Network {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Classify an HTTP status into a blocked or plain status error.
    pub fn from_status(url: impl Into<String>, status: u16) -> Self {
        let url = url.into();
        if is_blocking_status(status) {
            Self::Blocked { url, status }
        } else {
            Self::Status { url, status }
        }
    }

    /// Create an extraction error with context.
    pub fn extraction(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Extraction {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a discovery error.
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery(message.into())
    }

    /// Whether the direct fetch loop should try again after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Blocked { .. } => true,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            _ => false,
        }
    }
}

/// Statuses the origin uses when it is rate limiting or challenging us.
pub fn is_blocking_status(status: u16) -> bool {
    status == 403 || status == 429 || status >= 500
}
