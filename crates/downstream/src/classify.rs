//! Consent challenge classification
//!
//! Decides whether a downstream failure can be resolved by sending the
//! user through interactive consent. Only an authentication failure whose
//! chained inner code is exactly `invalid_grant` qualifies; everything else,
//! including `interaction_required` and bare 401s, is passed through as-is.

use crate::error::{DownstreamError, FailureCategory};

/// Inner error code that signals missing user consent.
pub const CONSENT_REQUIRED_CODE: &str = "invalid_grant";

/// Outcome of inspecting a downstream failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Interactive consent will resolve the failure
    ConsentRequired { inner_code: String },
    /// Anything else; `message` is the original failure text
    Other { message: String },
}

/// Classify a downstream failure by structural match on category and inner cause.
pub fn classify(err: &DownstreamError) -> Classification {
    match (&err.category, &err.inner) {
        (FailureCategory::AuthenticationFailed, Some(inner))
            if inner.code == CONSENT_REQUIRED_CODE =>
        {
            Classification::ConsentRequired {
                inner_code: inner.code.clone(),
            }
        }
        _ => Classification::Other {
            message: err.message.clone(),
        },
    }
}
