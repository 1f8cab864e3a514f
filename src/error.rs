//! Error types for Askdesk
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Askdesk operations
///
/// This enum encompasses all possible errors that can occur while talking
/// to the document Q&A backend, managing chat sessions, and persisting
/// client-local settings.
#[derive(Error, Debug)]
pub enum AskdeskError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backend returned a non-success status code
    ///
    /// Carries the human-readable message (from the response body when one
    /// was present), the numeric status code, and the correlation id taken
    /// from the `X-Request-ID` response header when present.
    #[error("API error {status}: {message}")]
    Api {
        /// Human-readable message from the response body, or a generic fallback
        message: String,
        /// HTTP status code of the final response
        status: u16,
        /// Correlation id from the `X-Request-ID` header, if any
        request_id: Option<String>,
    },

    /// Authentication errors (e.g. 401 Unauthorized after the retry budget)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The request was cancelled by the caller
    ///
    /// Cancellation is a deliberate action, not a failure; callers are
    /// expected to match on this variant and suppress it.
    #[error("Request cancelled")]
    Cancelled,

    /// Chat session errors (no active session, unknown session id, ...)
    #[error("Session error: {0}")]
    Session(String),

    /// Settings persistence errors
    #[error("Settings error: {0}")]
    Settings(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

impl AskdeskError {
    /// Returns true if this error is the cancellation marker
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type alias for Askdesk operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
