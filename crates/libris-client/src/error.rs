//! Error types for the Libris client.
//!
//! Every fallible operation in this crate returns [`ApiResult`]. Transport
//! failures, non-success HTTP statuses and refresh failures are kept as
//! distinct variants so the gateway can triage them and callers can decide
//! whether the user has to log in again.

use reqwest::StatusCode;
use serde_json::Value;

use crate::credentials::StoreError;

/// Result type alias for client operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur while talking to the backend or the catalogs.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request did not complete within the configured timeout.
    #[error("Request to {url} timed out")]
    Timeout {
        /// The URL that was being requested.
        url: String,
    },

    /// The request never produced a response (connection refused, DNS, TLS...).
    #[error("Failed to connect to {url}: {message}")]
    Network {
        /// The URL that was being requested.
        url: String,
        /// Description of the transport failure.
        message: String,
    },

    /// The server answered with a non-success status code.
    #[error("HTTP {status}: {}", describe_body(body))]
    Status {
        /// The HTTP status returned by the server.
        status: StatusCode,
        /// The raw response body.
        body: String,
    },

    /// The token refresh attempt failed; stored credentials have been cleared.
    #[error("Session expired, token refresh failed: {0}")]
    RefreshFailed(#[source] Box<ApiError>),

    /// The refresh endpoint answered without an access token.
    #[error("No access token in refresh response")]
    MissingAccessToken,

    /// A response could not be decoded into the expected shape.
    #[error("Failed to decode response: {message}")]
    Decode {
        /// Description of the decoding failure.
        message: String,
    },

    /// A response decoded but is missing fields the client relies on.
    #[error("Malformed response: {message}")]
    Malformed {
        /// Description of what is missing.
        message: String,
    },

    /// A URL could not be built from the configuration.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Reading or writing the credential store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Returns the HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is an authentication failure (HTTP 401).
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Whether the user has to authenticate again before retrying.
    #[must_use]
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::RefreshFailed(_)) || self.is_unauthorized()
    }

    pub(crate) fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// Condenses a Django REST style error body into a single line.
///
/// `{"password": ["too short", "too common"], "email": "taken"}` becomes
/// `email: taken; password: too short, too common`. Bodies that are not JSON
/// objects are returned unchanged.
pub fn describe_body(body: &str) -> String {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };

    for key in ["error", "detail"] {
        if map.len() == 1
            && let Some(Value::String(msg)) = map.get(key)
        {
            return msg.clone();
        }
    }

    let mut parts: Vec<String> = map
        .iter()
        .map(|(field, value)| format!("{field}: {}", flatten(value)))
        .collect();
    parts.sort();
    if parts.is_empty() {
        body.to_string()
    } else {
        parts.join("; ")
    }
}

fn flatten(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(flatten).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}
