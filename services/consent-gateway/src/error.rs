//! Step-up request outcomes that end a request early

use downstream::{DownstreamError, FailureCategory};
use thiserror::Error;

/// Why a step-up request did not return the downstream result.
///
/// `ConsentRequired` is not a failure from the caller's point of view: it
/// renders as a guidance body with a login link. The other variants render
/// as `{"error": <Display>}`.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed `Authorization` header; downstream never called
    #[error(transparent)]
    Input(consent_auth::Error),

    #[error("User consent required")]
    ConsentRequired { login_url: String },

    /// Any downstream failure that consent would not resolve
    #[error(transparent)]
    Downstream(#[from] DownstreamError),

    /// Consent URL could not be built from the app registration
    #[error("{0}")]
    Configuration(consent_auth::Error),
}

impl From<consent_auth::Error> for Error {
    fn from(err: consent_auth::Error) -> Self {
        if err.is_input_error() {
            Self::Input(err)
        } else {
            Self::Configuration(err)
        }
    }
}

impl Error {
    /// Metric label for the `outcome` dimension.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Input(_) => "input_error",
            Self::ConsentRequired { .. } => "consent_required",
            Self::Downstream(e) if e.category == FailureCategory::Cancelled => "cancelled",
            Self::Downstream(_) => "downstream_error",
            Self::Configuration(_) => "configuration_error",
        }
    }
}

/// Result alias for step-up handling
pub type Result<T> = std::result::Result<T, Error>;
