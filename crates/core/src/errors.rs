//! Error types shared by every sfsync crate.

use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the sync core and the collaborators it drives.
#[derive(Debug, Error)]
pub enum Error {
    /// Value is not a 15- or 18-character Salesforce id.
    #[error("Invalid Salesforce id '{0}': expected 15 or 18 characters")]
    InvalidIdentifier(String),

    /// Network or HTTP layer failure talking to the remote API.
    #[error("Remote transport error: {0}")]
    RemoteTransport(String),

    /// Well-formed error envelope returned by the remote API.
    #[error("{message}")]
    RemoteApi { code: String, message: String },

    /// Access token rejected again after a refresh.
    #[error("Salesforce session expired: {0}")]
    AuthExpired(String),

    /// No refresh token stored; the client must be re-authorized.
    #[error("No Salesforce refresh token stored. Authorize the connection first.")]
    MissingRefreshToken,

    /// Object metadata has no field with the given name.
    #[error("Field '{field}' not found on {object}")]
    FieldNotFound { object: String, field: String },

    /// Field mapping cannot produce a pull value.
    #[error("No data to pull for field '{0}'")]
    NoDataToPull(String),

    /// SOQL operator contains forbidden characters.
    #[error("Rejected SOQL operator '{0}'")]
    QueryOperatorRejected(String),

    /// No mapped object for the requested correlation.
    #[error("Mapped object not found: {0}")]
    MappedObjectNotFound(String),

    /// Mapping configuration violates an invariant.
    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),

    /// Host record store failure.
    #[error("Local store error: {0}")]
    LocalStore(String),

    /// Persistence failure for sync bookkeeping.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid request (missing required data, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a remote API error from an envelope code and message.
    pub fn remote_api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteApi {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn field_not_found(object: impl Into<String>, field: impl Into<String>) -> Self {
        Self::FieldNotFound {
            object: object.into(),
            field: field.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn local_store(message: impl Into<String>) -> Self {
        Self::LocalStore(message.into())
    }

    /// Auth failures suspend a whole batch instead of failing items one by one.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthExpired(_) | Self::MissingRefreshToken)
    }

    /// Field-level failures are skipped during pull; everything else aborts.
    pub fn is_skippable_field_error(&self) -> bool {
        matches!(
            self,
            Self::FieldNotFound { .. }
                | Self::NoDataToPull(_)
                | Self::InvalidIdentifier(_)
                | Self::MappedObjectNotFound(_)
                | Self::LocalStore(_)
        )
    }

    /// Error code of a remote API envelope, if any.
    pub fn remote_code(&self) -> Option<&str> {
        match self {
            Self::RemoteApi { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }
}
