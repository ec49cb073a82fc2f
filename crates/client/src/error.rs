//! Client error types

use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    /// The access token could not be renewed, stored credentials were cleared
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// No refresh token in storage
    #[error("No refresh token available")]
    RefreshUnavailable,

    /// Refresh endpoint rejected the refresh token
    #[error("Unable to refresh access token (status {status})")]
    RefreshFailed { status: u16 },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Token storage failure
    #[error("Token storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code and response body
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        Self::Http {
            status: status.as_u16(),
            body,
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::RefreshFailed { status } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the caller has to log in again
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
