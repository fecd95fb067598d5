//! Step-up consent primitives
//!
//! Everything the gateway needs to turn a consent-required rejection into
//! an interactive login link, with no I/O of its own:
//!
//! 1. `bearer::bearer_credential()` lifts the caller's token off the request
//! 2. `pending::PendingConsents::begin()` mints a PKCE pair and a state value
//! 3. `redirect::redirect_uri()` derives where the identity provider returns
//! 4. `authorize::AuthorizeEndpoint::authorization_url()` assembles the link
//! 5. `pending::PendingConsents::take()` correlates the callback's state

pub mod authorize;
pub mod bearer;
pub mod constants;
pub mod error;
pub mod pending;
pub mod pkce;
pub mod redirect;

pub use authorize::{AuthorizationRequest, AuthorizeEndpoint, build_authorization_url};
pub use bearer::bearer_credential;
pub use constants::*;
pub use error::{Error, Result};
pub use pending::PendingConsents;
pub use pkce::{PkceParameters, compute_challenge, generate_verifier};
pub use redirect::redirect_uri;
