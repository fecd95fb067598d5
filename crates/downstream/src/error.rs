//! Structured downstream failures

use std::fmt;

/// Outer category of a failed downstream invocation.
///
/// The category alone never decides whether consent is needed: an
/// `AuthenticationFailed` covers expired tokens, wrong audiences and
/// consent gaps alike. See `InnerFailure` for the discriminating code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCategory {
    /// The downstream rejected the credential (401/403)
    AuthenticationFailed,
    /// Any other non-success status
    Rejected { status: u16 },
    /// Connection, TLS or timeout failure before a response arrived
    Transport,
    /// A success status with a body that is not JSON
    InvalidResponse,
    /// The inbound request went away before the call completed
    Cancelled,
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthenticationFailed => f.write_str("authentication_failed"),
            Self::Rejected { status } => write!(f, "rejected_{status}"),
            Self::Transport => f.write_str("transport"),
            Self::InvalidResponse => f.write_str("invalid_response"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Machine-readable cause chained under an outer failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}")]
pub struct InnerFailure {
    /// OAuth error code, e.g. `invalid_grant` or `interaction_required`
    pub code: String,
    pub description: Option<String>,
}

impl InnerFailure {
    pub fn new(code: impl Into<String>, description: Option<String>) -> Self {
        Self {
            code: code.into(),
            description,
        }
    }
}

/// A classified failure from a downstream invocation.
///
/// `message` is the human-readable text that is forwarded to the caller
/// unchanged when the failure is not consent-related.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct DownstreamError {
    pub category: FailureCategory,
    pub message: String,
    #[source]
    pub inner: Option<InnerFailure>,
}

impl DownstreamError {
    pub fn authentication(message: impl Into<String>, inner: Option<InnerFailure>) -> Self {
        Self {
            category: FailureCategory::AuthenticationFailed,
            message: message.into(),
            inner,
        }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self {
            category: FailureCategory::Rejected { status },
            message: message.into(),
            inner: None,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            category: FailureCategory::Transport,
            message: message.into(),
            inner: None,
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            category: FailureCategory::InvalidResponse,
            message: message.into(),
            inner: None,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            category: FailureCategory::Cancelled,
            message: "downstream call cancelled".into(),
            inner: None,
        }
    }
}

/// Result alias for downstream invocations.
pub type Result<T> = std::result::Result<T, DownstreamError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn inner_failure_is_exposed_as_source() {
        let err = DownstreamError::authentication(
            "authentication failed",
            Some(InnerFailure::new("invalid_grant", None)),
        );
        let source = err.source().expect("inner failure chained");
        assert_eq!(source.to_string(), "invalid_grant");
    }

    #[test]
    fn display_is_the_message() {
        let err = DownstreamError::rejected(503, "downstream returned 503");
        assert_eq!(err.to_string(), "downstream returned 503");
        assert!(err.source().is_none());
    }

    #[test]
    fn category_labels_are_metric_friendly() {
        assert_eq!(
            FailureCategory::AuthenticationFailed.to_string(),
            "authentication_failed"
        );
        assert_eq!(
            FailureCategory::Rejected { status: 404 }.to_string(),
            "rejected_404"
        );
        assert_eq!(DownstreamError::cancelled().category.to_string(), "cancelled");
    }
}
