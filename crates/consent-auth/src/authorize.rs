//! Authorization endpoint URL construction
//!
//! Builds the Microsoft identity platform v2 authorization-code request:
//! `https://<authority>/<tenant>/oauth2/v2.0/authorize?...` with parameters
//! in a fixed order so generated links are reproducible.

use crate::constants::{CODE_CHALLENGE_METHOD, DEFAULT_AUTHORITY, DEFAULT_SCOPE};
use crate::error::{Error, Result};

/// One authorization-code request, built fresh per consent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub tenant_id: String,
    pub client_id: String,
    pub redirect_uri: String,
    /// Space-delimited scope list
    pub scope: String,
    pub state: String,
    pub code_challenge: String,
}

impl AuthorizationRequest {
    pub fn code_challenge_method(&self) -> &'static str {
        CODE_CHALLENGE_METHOD
    }
}

/// Build the authorization URL for `request` against `authority`.
///
/// Every dynamic value is percent-encoded as a query component. Fails with
/// `InvalidConfiguration` when the tenant or client id is blank.
pub fn build_authorization_url(authority: &str, request: &AuthorizationRequest) -> Result<String> {
    if request.tenant_id.trim().is_empty() {
        return Err(Error::InvalidConfiguration("tenant id is blank".into()));
    }
    if request.client_id.trim().is_empty() {
        return Err(Error::InvalidConfiguration("client id is blank".into()));
    }

    Ok(format!(
        "https://{}/{}/oauth2/v2.0/authorize?client_id={}&response_type=code&redirect_uri={}&response_mode=query&scope={}&state={}&code_challenge={}&code_challenge_method={}",
        authority.trim_end_matches('/'),
        urlencoding::encode(&request.tenant_id),
        urlencoding::encode(&request.client_id),
        urlencoding::encode(&request.redirect_uri),
        urlencoding::encode(&request.scope),
        urlencoding::encode(&request.state),
        urlencoding::encode(&request.code_challenge),
        request.code_challenge_method(),
    ))
}

/// Tenant/client identity of the gateway's app registration.
///
/// Validated once at startup and shared read-only across requests.
#[derive(Debug, Clone)]
pub struct AuthorizeEndpoint {
    authority: String,
    tenant_id: String,
    client_id: String,
    scope: String,
}

impl AuthorizeEndpoint {
    /// Validate and capture the app registration. Empty `scopes` falls back
    /// to `DEFAULT_SCOPE`; blank authority falls back to `DEFAULT_AUTHORITY`.
    pub fn new(
        authority: &str,
        tenant_id: &str,
        client_id: &str,
        scopes: &[String],
    ) -> Result<Self> {
        let tenant_id = tenant_id.trim();
        let client_id = client_id.trim();
        if tenant_id.is_empty() {
            return Err(Error::InvalidConfiguration("tenant id is blank".into()));
        }
        if client_id.is_empty() {
            return Err(Error::InvalidConfiguration("client id is blank".into()));
        }

        let authority = authority.trim();
        let scope = scopes
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Self {
            authority: if authority.is_empty() {
                DEFAULT_AUTHORITY.to_string()
            } else {
                authority.to_string()
            },
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            scope: if scope.is_empty() {
                DEFAULT_SCOPE.to_string()
            } else {
                scope
            },
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Assemble a request for this registration.
    pub fn request(
        &self,
        redirect_uri: &str,
        state: &str,
        challenge: &str,
    ) -> AuthorizationRequest {
        AuthorizationRequest {
            tenant_id: self.tenant_id.clone(),
            client_id: self.client_id.clone(),
            redirect_uri: redirect_uri.to_string(),
            scope: self.scope.clone(),
            state: state.to_string(),
            code_challenge: challenge.to_string(),
        }
    }

    /// Build the login link for one consent event.
    pub fn authorization_url(
        &self,
        redirect_uri: &str,
        state: &str,
        challenge: &str,
    ) -> Result<String> {
        build_authorization_url(&self.authority, &self.request(redirect_uri, state, challenge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> AuthorizationRequest {
        AuthorizationRequest {
            tenant_id: "t1".into(),
            client_id: "c1".into(),
            redirect_uri: "https://host/auth/callback".into(),
            scope: "User.Read".into(),
            state: "consent_required".into(),
            code_challenge: "abc123".into(),
        }
    }

    #[test]
    fn url_contains_required_params() {
        let url = build_authorization_url(DEFAULT_AUTHORITY, &sample_request()).unwrap();

        assert!(url.starts_with("https://login.microsoftonline.com/t1/oauth2/v2.0/authorize?"));
        assert!(url.contains("client_id=c1"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("response_mode=query"));
        assert!(url.contains("code_challenge=abc123"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("state=consent_required"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fhost%2Fauth%2Fcallback"));
    }

    #[test]
    fn parameters_appear_in_fixed_order() {
        let url = build_authorization_url(DEFAULT_AUTHORITY, &sample_request()).unwrap();
        let query = url.split_once('?').unwrap().1;
        let keys: Vec<&str> = query
            .split('&')
            .map(|pair| pair.split_once('=').unwrap().0)
            .collect();
        assert_eq!(
            keys,
            [
                "client_id",
                "response_type",
                "redirect_uri",
                "response_mode",
                "scope",
                "state",
                "code_challenge",
                "code_challenge_method",
            ]
        );
    }

    #[test]
    fn reserved_characters_are_encoded() {
        let mut request = sample_request();
        request.scope = "openid offline_access https://graph.microsoft.com/Mail.Read".into();
        request.state = "a&b=c#d".into();
        let url = build_authorization_url(DEFAULT_AUTHORITY, &request).unwrap();

        assert!(url.contains(
            "scope=openid%20offline_access%20https%3A%2F%2Fgraph.microsoft.com%2FMail.Read"
        ));
        assert!(url.contains("state=a%26b%3Dc%23d&"));
        assert_eq!(url.matches('#').count(), 0);
    }

    #[test]
    fn blank_tenant_or_client_is_invalid_configuration() {
        let mut request = sample_request();
        request.tenant_id = "  ".into();
        assert!(matches!(
            build_authorization_url(DEFAULT_AUTHORITY, &request),
            Err(Error::InvalidConfiguration(_))
        ));

        let mut request = sample_request();
        request.client_id = String::new();
        assert!(matches!(
            build_authorization_url(DEFAULT_AUTHORITY, &request),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn endpoint_rejects_blank_identity() {
        assert!(AuthorizeEndpoint::new("", "", "c1", &[]).is_err());
        assert!(AuthorizeEndpoint::new("", "t1", " ", &[]).is_err());
    }

    #[test]
    fn endpoint_defaults_authority_and_scope() {
        let endpoint = AuthorizeEndpoint::new("", "t1", "c1", &[]).unwrap();
        assert_eq!(endpoint.scope(), "User.Read");
        let url = endpoint
            .authorization_url("https://host/auth/callback", "s", "abc123")
            .unwrap();
        assert!(url.starts_with("https://login.microsoftonline.com/t1/"));
    }

    #[test]
    fn endpoint_joins_scopes_with_spaces() {
        let scopes = vec!["User.Read".to_string(), " ".to_string(), "Mail.Read".to_string()];
        let endpoint =
            AuthorizeEndpoint::new("login.example.net/", "t1", "c1", &scopes).unwrap();
        assert_eq!(endpoint.scope(), "User.Read Mail.Read");
        let url = endpoint.authorization_url("https://h/cb", "s", "x").unwrap();
        assert!(url.starts_with("https://login.example.net/t1/oauth2/v2.0/authorize?"));
        assert!(url.contains("scope=User.Read%20Mail.Read"));
    }
}
