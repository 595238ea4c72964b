//! Error types used throughout the client

use serde_json::Value;
use thiserror::Error;

/// Main error type for AdLane API operations.
///
/// Every variant carries owned data only — transport errors are flattened to
/// their message and response bodies are kept as parsed JSON, so no raw
/// `reqwest` response object ever ends up in an error chain or a log line.
/// The type is `Clone` because a coalesced authentication attempt hands the
/// same failure to every waiter.
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    /// Login was rejected, either logically (`success: false` in the body)
    /// or at the HTTP level.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Network or connection failure below the HTTP status line.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx response the dispatcher could not handle itself. The parsed
    /// body is kept so the error classifier can inspect it.
    #[error("Status code error: HTTP {status}")]
    Status {
        /// HTTP status code of the response.
        status: u16,
        /// Parsed response body (`null` when the body was empty, a JSON
        /// string when it was not valid JSON).
        body: Value,
    },

    /// A 2xx response whose body declared `success: false`.
    #[error("Application error: request reported failure in a 2xx response")]
    Application {
        /// Parsed response body that carried the failure flag.
        body: Value,
    },

    /// Invalid configuration supplied at construction.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream contract violation or other unexpected condition.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for AdLane client operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Flatten a transport-level failure into an owned message.
    pub(crate) fn transport(err: &reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
