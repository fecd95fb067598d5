//! Error types for consent operations

/// Errors from credential extraction and authorization URL construction.
///
/// The `Display` text of the three input variants is returned verbatim to
/// callers in the `error` field of the JSON response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Authorization header not found in request")]
    MissingHeader,

    #[error("Authorization header must contain a Bearer token")]
    MalformedScheme,

    #[error("Bearer token is empty in Authorization header")]
    EmptyCredential,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl Error {
    /// Whether this error came from the inbound request rather than configuration.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, Self::InvalidConfiguration(_))
    }
}

/// Result alias for consent operations.
pub type Result<T> = std::result::Result<T, Error>;
