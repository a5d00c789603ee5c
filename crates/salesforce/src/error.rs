//! Error types for the Salesforce client crate.

use sfsync_core::sync::{classify_http_status, SyncRetryClass};
use thiserror::Error;

/// Result type alias for Salesforce client operations.
pub type Result<T> = std::result::Result<T, SalesforceError>;

#[derive(Debug, Error)]
pub enum SalesforceError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error envelope returned by the REST API. Displays the remote message verbatim.
    #[error("{message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Access token rejected, including after a refresh.
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("No refresh token stored")]
    MissingRefreshToken,

    /// Invalid request (missing required data, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Failure reading or writing stored credentials.
    #[error(transparent)]
    Core(#[from] sfsync_core::Error),
}

impl SalesforceError {
    pub fn api(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify error for retry policy.
    pub fn retry_class(&self) -> SyncRetryClass {
        match self {
            Self::Api { status, .. } => classify_http_status(*status),
            Self::Http(_) => SyncRetryClass::Retryable,
            Self::Json(_) | Self::InvalidRequest(_) => SyncRetryClass::Permanent,
            Self::Auth(_) | Self::MissingRefreshToken => SyncRetryClass::ReauthRequired,
            Self::Core(err) => sfsync_core::sync::classify_error(err),
        }
    }
}

impl From<SalesforceError> for sfsync_core::Error {
    fn from(err: SalesforceError) -> Self {
        match err {
            SalesforceError::Http(err) => sfsync_core::Error::RemoteTransport(err.to_string()),
            SalesforceError::Json(err) => sfsync_core::Error::Json(err),
            SalesforceError::Api { code, message, .. } => {
                sfsync_core::Error::RemoteApi { code, message }
            }
            SalesforceError::Auth(message) => sfsync_core::Error::AuthExpired(message),
            SalesforceError::MissingRefreshToken => sfsync_core::Error::MissingRefreshToken,
            SalesforceError::InvalidRequest(message) => {
                sfsync_core::Error::InvalidRequest(message)
            }
            SalesforceError::Core(err) => err,
        }
    }
}
