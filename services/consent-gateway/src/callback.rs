//! Identity provider redirect target
//!
//! Terminal endpoint the user's browser lands on after interactive login.
//! It picks one of three outcomes from the query string, consumes the
//! pending consent entry named by `state`, and renders a status page. The
//! authorization code is not exchanged here.

use consent_auth::PendingConsents;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{metrics, pages};

const NO_CODE_OR_ERROR: &str = "No authorization code or error received";

/// Query parameters of `GET /auth/callback`
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub state: Option<String>,
}

/// What the redirect told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// An authorization code arrived
    Success,
    /// The identity provider reported an error
    ProviderError {
        error: String,
        description: Option<String>,
    },
    /// Neither code nor error was present
    Malformed,
}

impl CallbackOutcome {
    /// `error` wins over `code`; blank values count as absent.
    pub fn from_params(params: &CallbackParams) -> Self {
        if let Some(error) = non_blank(&params.error) {
            return Self::ProviderError {
                error: error.to_string(),
                description: non_blank(&params.error_description).map(str::to_owned),
            };
        }
        if non_blank(&params.code).is_some() {
            return Self::Success;
        }
        Self::Malformed
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ProviderError { .. } => "provider_error",
            Self::Malformed => "malformed",
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::Success => pages::success(),
            Self::ProviderError { error, description } => {
                pages::error(error, description.as_deref())
            }
            Self::Malformed => pages::error(NO_CODE_OR_ERROR, None),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Handle one redirect and return the HTML page to show.
pub async fn handle(pending: &PendingConsents, params: &CallbackParams) -> String {
    let outcome = CallbackOutcome::from_params(params);

    let correlated = match non_blank(&params.state) {
        Some(state) => pending.take(state).await.is_some(),
        None => false,
    };

    match &outcome {
        CallbackOutcome::Success => {
            info!(correlated, "authentication callback received authorization code")
        }
        CallbackOutcome::ProviderError { error, .. } => {
            warn!(error = %error, correlated, "authentication callback received error")
        }
        CallbackOutcome::Malformed => {
            warn!(correlated, "authentication callback received without code or error")
        }
    }
    metrics::record_callback(outcome.label(), correlated);

    outcome.render()
}
