//! Downstream invocation contract for the consent gateway
//!
//! The gateway never talks to a protected API directly. It hands the
//! caller's bearer credential to a `Downstream` implementation and receives
//! either the API's JSON result or a structured `DownstreamError`. The
//! error keeps the outer failure category separate from the chained inner
//! failure code so `classify` can tell a consent-required rejection apart
//! from every other authentication failure.

pub mod classify;
pub mod error;
pub mod http;

pub use classify::{CONSENT_REQUIRED_CODE, Classification, classify};
pub use error::{DownstreamError, FailureCategory, InnerFailure, Result};
pub use http::HttpDownstream;

use common::Secret;
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// A protected capability invoked on behalf of the caller.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Downstream>`).
pub trait Downstream: Send + Sync {
    /// Identifier for logging (e.g. "http")
    fn id(&self) -> &str;

    /// Invoke the capability with the caller's credential.
    ///
    /// Implementations must stop work and return a `Cancelled` failure once
    /// `cancel` fires; the token is tied to the inbound request's lifetime.
    fn invoke<'a>(
        &'a self,
        credential: &'a Secret<String>,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send + 'a>>;
}
