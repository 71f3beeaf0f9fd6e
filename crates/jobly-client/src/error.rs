//! Client error types.

use jobly_models::ApiErrorBody;
use reqwest::StatusCode;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Failure of a token refresh cycle.
///
/// Cloneable so the same failure can be handed to every request that was
/// queued behind the refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RefreshError {
    /// HTTP status of the refresh endpoint, if it responded at all.
    pub status: Option<u16>,
    pub message: String,
    abandoned: bool,
}

impl RefreshError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            abandoned: false,
        }
    }

    /// The leader of a refresh cycle went away before settling it.
    pub fn abandoned() -> Self {
        Self {
            abandoned: true,
            ..Self::new(None, "Token refresh was abandoned before completing")
        }
    }

    /// True if the cycle ended without a verdict from the refresh endpoint.
    /// The session is still intact and waiters may start a new cycle.
    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }
}

/// Errors that can occur while talking to the API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response reached the client (connect failure, timeout, TLS, ...).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Request failed with status {status}: {}", summarize_body(.body))]
    Status { status: u16, body: String },

    /// The access token could not be refreshed; the session is over.
    #[error("Session expired: {0}")]
    Refresh(#[from] RefreshError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl ClientError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn from_status(status: StatusCode, body: impl Into<String>) -> Self {
        Self::Status {
            status: status.as_u16(),
            body: body.into(),
        }
    }

    /// HTTP status associated with the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Refresh(e) => e.status,
            ClientError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Status { status: 401, .. })
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ClientError::Refresh(_))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }

    /// Parsed error body for status errors.
    pub fn api_error(&self) -> Option<ApiErrorBody> {
        match self {
            ClientError::Status { body, .. } => ApiErrorBody::parse(body),
            _ => None,
        }
    }

    /// Human-readable message suitable for display.
    pub fn api_message(&self) -> String {
        self.api_error()
            .and_then(|body| body.summary())
            .unwrap_or_else(|| self.to_string())
    }
}

fn summarize_body(body: &str) -> String {
    if let Some(summary) = ApiErrorBody::parse(body).and_then(|b| b.summary()) {
        return summary;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    // Keep HTML error pages from flooding logs.
    trimmed.chars().take(200).collect()
}
