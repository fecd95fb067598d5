//! Step-up consent orchestration
//!
//! Authenticates the inbound request, relays the caller's token to the
//! downstream capability, and turns a consent-required rejection into a
//! login link instead of an opaque error. Every outcome is rendered as a
//! pretty-printed camelCase JSON object; that shape is what clients parse.

use std::sync::Arc;
use std::time::Instant;

use axum::http::HeaderMap;
use consent_auth::{AuthorizeEndpoint, PendingConsents, bearer_credential, redirect_uri};
use downstream::{Classification, Downstream, classify};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::metrics;

/// `error` text of the consent guidance body
pub const CONSENT_REQUIRED_ERROR: &str = "User consent required";

/// `message` text of the consent guidance body
pub const CONSENT_GUIDANCE: &str = "Additional permissions are required to complete this request. \
Open loginUrl in a browser, sign in and grant consent, then retry the request.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentResponse<'a> {
    pub error: &'a str,
    pub message: &'a str,
    pub login_url: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
}

/// Composes credential extraction, classification and consent URL building.
///
/// Holds only read-only configuration plus the shared pending-consent store,
/// so one instance serves all requests concurrently.
pub struct StepUp {
    endpoint: AuthorizeEndpoint,
    pending: Arc<PendingConsents>,
    public_base_url: Option<String>,
}

impl StepUp {
    pub fn new(
        endpoint: AuthorizeEndpoint,
        pending: Arc<PendingConsents>,
        public_base_url: Option<String>,
    ) -> Self {
        Self {
            endpoint,
            pending,
            public_base_url,
        }
    }

    /// Run one step-up request.
    ///
    /// `cancel` is tied to the inbound request and forwarded to the downstream
    /// call. No retries: every failure is returned in this call.
    pub async fn handle(
        &self,
        headers: &HeaderMap,
        downstream: &dyn Downstream,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value> {
        let credential = bearer_credential(headers).inspect_err(|e| {
            warn!(reason = %e, "rejecting request without a usable bearer credential");
        })?;
        debug!(downstream = downstream.id(), "bearer credential present, invoking downstream");

        let started = Instant::now();
        let result = downstream.invoke(&credential, cancel).await;
        metrics::record_downstream_duration(started.elapsed().as_secs_f64());

        let failure = match result {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        match classify(&failure) {
            Classification::ConsentRequired { inner_code } => {
                info!(inner_code = %inner_code, "downstream requires user consent");
                let login_url = self.consent_url(headers).await?;
                Err(Error::ConsentRequired { login_url })
            }
            Classification::Other { message } => {
                warn!(
                    category = %failure.category,
                    error = %message,
                    "downstream invocation failed"
                );
                Err(Error::Downstream(failure))
            }
        }
    }

    /// Mint a consent event and build its login link.
    async fn consent_url(&self, headers: &HeaderMap) -> Result<String> {
        let redirect = redirect_uri(headers, self.public_base_url.as_deref());
        let (state, pkce) = self.pending.begin().await;
        let url = self
            .endpoint
            .authorization_url(&redirect, &state, &pkce.challenge)?;
        info!(state = %state, redirect_uri = %redirect, "issued consent URL");
        Ok(url)
    }
}

/// Serialize a step-up result into the response body.
pub fn render(result: &Result<serde_json::Value>) -> String {
    let body = match result {
        Ok(value) => serde_json::to_string_pretty(value),
        Err(Error::ConsentRequired { login_url }) => serde_json::to_string_pretty(&ConsentResponse {
            error: CONSENT_REQUIRED_ERROR,
            message: CONSENT_GUIDANCE,
            login_url,
        }),
        Err(e) => serde_json::to_string_pretty(&ErrorResponse {
            error: e.to_string(),
        }),
    };
    body.unwrap_or_else(|e| format!("{{\n  \"error\": \"response serialization failed: {e}\"\n}}"))
}

/// Metric label for a step-up result.
pub fn outcome(result: &Result<serde_json::Value>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => e.outcome(),
    }
}


#[cfg(test)]
mod tests {
    use super::fake::ScriptedDownstream;
    use super::*;
    use axum::http::HeaderValue;
    use downstream::{DownstreamError, InnerFailure};
    use std::time::Duration;

    fn step_up() -> (StepUp, Arc<PendingConsents>) {
        let pending = Arc::new(PendingConsents::new(Duration::from_secs(600)));
        let endpoint = AuthorizeEndpoint::new("", "t1", "c1", &["User.Read".to_string()]).unwrap();
        (StepUp::new(endpoint, pending.clone(), None), pending)
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers.insert("host", HeaderValue::from_static("gw.example.com"));
        headers
    }

    fn consent_failure() -> DownstreamError {
        DownstreamError::authentication(
            "authentication failed: AADSTS65001",
            Some(InnerFailure::new("invalid_grant", None)),
        )
    }

    #[tokio::test]
    async fn success_returns_downstream_value_unchanged() {
        let (step_up, _) = step_up();
        let profile = serde_json::json!({"displayName": "Ada", "jobTitle": "Engineer"});
        let fake = ScriptedDownstream::returning(Ok(profile.clone()));

        let result = step_up
            .handle(&bearer("tok"), &fake, &CancellationToken::new())
            .await;

        assert_eq!(result.as_ref().unwrap(), &profile);
        assert_eq!(fake.seen_tokens.lock().unwrap().as_slice(), ["tok"]);

        let body: serde_json::Value = serde_json::from_str(&render(&result)).unwrap();
        assert_eq!(body["displayName"], "Ada");
        assert!(body.get("loginUrl").is_none());
        assert!(body.get("error").is_none());
        assert_eq!(outcome(&result), "success");
    }

    #[tokio::test]
    async fn missing_header_never_reaches_downstream() {
        let (step_up, _) = step_up();
        let fake = ScriptedDownstream::returning(Ok(serde_json::json!({})));

        let result = step_up
            .handle(&HeaderMap::new(), &fake, &CancellationToken::new())
            .await;

        assert_eq!(fake.calls(), 0);
        assert_eq!(outcome(&result), "input_error");
        let body: serde_json::Value = serde_json::from_str(&render(&result)).unwrap();
        assert_eq!(body["error"], "Authorization header not found in request");
    }

    #[tokio::test]
    async fn malformed_and_empty_credentials_have_specific_messages() {
        let (step_up, _) = step_up();
        let fake = ScriptedDownstream::returning(Ok(serde_json::json!({})));

        for (value, expected) in [
            ("Basic abc", "Authorization header must contain a Bearer token"),
            ("Bearer   ", "Bearer token is empty in Authorization header"),
        ] {
            let mut headers = HeaderMap::new();
            headers.insert("authorization", HeaderValue::from_static(value));
            let result = step_up
                .handle(&headers, &fake, &CancellationToken::new())
                .await;
            let body: serde_json::Value = serde_json::from_str(&render(&result)).unwrap();
            assert_eq!(body["error"], expected);
        }
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn consent_required_returns_guidance_with_login_url() {
        let (step_up, pending) = step_up();
        let fake = ScriptedDownstream::returning(Err(consent_failure()));

        let result = step_up
            .handle(&bearer("tok"), &fake, &CancellationToken::new())
            .await;
        assert_eq!(outcome(&result), "consent_required");

        let rendered = render(&result);
        assert!(
            rendered.contains("\n  \"loginUrl\""),
            "must be pretty-printed camelCase: {rendered}"
        );
        let body: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(body["error"], "User consent required");
        assert_eq!(body["message"], CONSENT_GUIDANCE);

        let login_url = body["loginUrl"].as_str().unwrap();
        assert!(
            login_url.starts_with("https://login.microsoftonline.com/t1/oauth2/v2.0/authorize?")
        );
        assert!(login_url.contains("client_id=c1"));
        assert!(login_url.contains("code_challenge_method=S256"));
        assert!(login_url.contains("redirect_uri=https%3A%2F%2Fgw.example.com%2Fauth%2Fcallback"));

        assert_eq!(pending.len().await, 1, "verifier parked for the callback");
        let state = login_url
            .split('&')
            .find_map(|p| p.strip_prefix("state="))
            .unwrap();
        assert!(pending.take(state).await.is_some());
    }

    #[tokio::test]
    async fn other_failures_carry_original_message() {
        let (step_up, pending) = step_up();
        let fake = ScriptedDownstream::returning(Err(DownstreamError::authentication(
            "authentication failed: interaction required",
            Some(InnerFailure::new("interaction_required", None)),
        )));

        let result = step_up
            .handle(&bearer("tok"), &fake, &CancellationToken::new())
            .await;

        assert_eq!(outcome(&result), "downstream_error");
        let body: serde_json::Value = serde_json::from_str(&render(&result)).unwrap();
        assert_eq!(body["error"], "authentication failed: interaction required");
        assert!(body.get("loginUrl").is_none());
        assert!(pending.is_empty().await);
    }

    #[tokio::test]
    async fn cancelled_request_is_reported_as_cancelled() {
        let (step_up, _) = step_up();
        let fake = ScriptedDownstream::returning(Ok(serde_json::json!({})));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = step_up.handle(&bearer("tok"), &fake, &cancel).await;
        assert_eq!(outcome(&result), "cancelled");
    }

    #[tokio::test]
    async fn configured_public_base_overrides_host() {
        let pending = Arc::new(PendingConsents::new(Duration::from_secs(600)));
        let endpoint = AuthorizeEndpoint::new("", "t1", "c1", &[]).unwrap();
        let step_up = StepUp::new(endpoint, pending, Some("https://public.example.com".into()));
        let fake = ScriptedDownstream::returning(Err(consent_failure()));

        let result = step_up
            .handle(&bearer("tok"), &fake, &CancellationToken::new())
            .await;
        let Err(Error::ConsentRequired { login_url }) = result else {
            panic!("expected consent required");
        };
        assert!(
            login_url.contains("redirect_uri=https%3A%2F%2Fpublic.example.com%2Fauth%2Fcallback")
        );
    }
}
