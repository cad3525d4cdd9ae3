//! Error types for membership reconciliation.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or running a reconciliation.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid connection configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Role name outside the closed set of roles.
    #[error("unknown role: {0} (expected Guest, Reporter, Developer, Maintainer or Owner)")]
    UnknownRole(String),

    /// Username lookup returned no exact match.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// Username lookup returned more than one exact match.
    #[error("username {username} matches {count} users")]
    AmbiguousUser { username: String, count: usize },

    /// Custom trust material could not be loaded.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Request failed before a response was received.
    #[error("request failed: {0}")]
    Request(String),

    /// GitLab answered with a non-success status.
    #[error("GitLab API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Response could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
