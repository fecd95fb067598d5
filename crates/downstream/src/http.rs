//! HTTP downstream: relays the caller's bearer token to a protected JSON API
//!
//! Sends `GET <url>` with the inbound credential and returns the JSON body
//! untouched. Authentication rejections are mapped to
//! `FailureCategory::AuthenticationFailed` with the OAuth error code from the
//! response body (or the `WWW-Authenticate` challenge) chained as the inner
//! failure.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use common::Secret;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, WWW_AUTHENTICATE};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::Downstream;
use crate::error::{DownstreamError, InnerFailure, Result};

/// Longest slice of a rejection body carried into the error message.
const MAX_BODY_EXCERPT: usize = 256;

/// Downstream that forwards the caller's token to a single JSON endpoint.
pub struct HttpDownstream {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpDownstream {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    #[instrument(skip_all, fields(url = %self.url))]
    async fn call(
        &self,
        credential: &Secret<String>,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value> {
        let request = self
            .client
            .get(&self.url)
            .bearer_auth(credential.expose())
            .header(ACCEPT, "application/json")
            .timeout(self.timeout);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DownstreamError::cancelled()),
            result = request.send() => result.map_err(|e| {
                DownstreamError::transport(format!("downstream request failed: {e}"))
            })?,
        };

        let status = response.status();
        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DownstreamError::cancelled()),
            result = response.text() => result.map_err(|e| {
                DownstreamError::transport(format!("downstream response read error: {e}"))
            })?,
        };

        debug!(status = status.as_u16(), "downstream responded");

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| {
                DownstreamError::invalid_response(format!("downstream returned invalid JSON: {e}"))
            });
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let inner = inner_failure_from_body(&body)
                .or_else(|| challenge.as_deref().and_then(inner_failure_from_challenge));
            let detail = inner
                .as_ref()
                .and_then(|i| i.description.clone())
                .unwrap_or_else(|| format!("downstream rejected the credential ({status})"));
            return Err(DownstreamError::authentication(
                format!("authentication failed: {detail}"),
                inner,
            ));
        }

        Err(DownstreamError::rejected(
            status.as_u16(),
            format!("downstream returned {status}: {}", excerpt(&body)),
        ))
    }
}

impl Downstream for HttpDownstream {
    fn id(&self) -> &str {
        "http"
    }

    fn invoke<'a>(
        &'a self,
        credential: &'a Secret<String>,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send + 'a>> {
        Box::pin(self.call(credential, cancel))
    }
}

/// Trim a response body to at most `MAX_BODY_EXCERPT` characters.
fn excerpt(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Extract the OAuth error from a rejection body.
///
/// Accepts both the token endpoint shape
/// (`{"error":"invalid_grant","error_description":"..."}`) and the Graph
/// shape (`{"error":{"code":"...","message":"..."}}`).
fn inner_failure_from_body(body: &str) -> Option<InnerFailure> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        serde_json::Value::String(code) => Some(InnerFailure::new(
            code.as_str(),
            value
                .get("error_description")
                .and_then(|d| d.as_str())
                .map(str::to_owned),
        )),
        serde_json::Value::Object(obj) => {
            let code = obj.get("code")?.as_str()?;
            Some(InnerFailure::new(
                code,
                obj.get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_owned),
            ))
        }
        _ => None,
    }
}

/// Extract `error` / `error_description` from a Bearer `WWW-Authenticate` challenge.
fn inner_failure_from_challenge(header: &str) -> Option<InnerFailure> {
    let code = auth_param(header, "error")?;
    Some(InnerFailure::new(
        code,
        auth_param(header, "error_description"),
    ))
}

/// Read a quoted auth-param value (RFC 7235) by exact name.
fn auth_param(header: &str, name: &str) -> Option<String> {
    let needle = format!("{name}=\"");
    for (idx, _) in header.match_indices(&needle) {
        let boundary = header[..idx]
            .chars()
            .next_back()
            .is_none_or(|c| c == ' ' || c == ',');
        if !boundary {
            continue;
        }
        let rest = &header[idx + needle.len()..];
        let end = rest.find('"')?;
        return Some(rest[..end].to_string());
    }
    None
}
