//! Identity provider constants
//!
//! Tenant and client identifiers are deployment configuration and live in
//! the gateway's config file, not here.

/// Microsoft identity platform host used when no authority is configured
pub const DEFAULT_AUTHORITY: &str = "login.microsoftonline.com";

/// Scope requested when no scopes are configured
pub const DEFAULT_SCOPE: &str = "User.Read";

/// Path the identity provider redirects the browser to
pub const CALLBACK_PATH: &str = "/auth/callback";

/// Only PKCE method we emit
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// Prefix of generated `state` values
pub const STATE_PREFIX: &str = "consent_";

/// Default cap on parked consent verifiers
pub const MAX_PENDING_CONSENTS: usize = 10_000;

/// Length of generated PKCE verifiers (RFC 7636 maximum)
pub const VERIFIER_LEN: usize = 128;
