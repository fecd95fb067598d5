//! Bearer credential extraction

use common::Secret;
use reqwest::header::{AUTHORIZATION, HeaderMap};

use crate::error::{Error, Result};

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the bearer token from the inbound `Authorization` header.
///
/// The scheme match is case-insensitive and includes the trailing space.
/// A header value that is not visible ASCII is treated as a malformed scheme.
pub fn bearer_credential(headers: &HeaderMap) -> Result<Secret<String>> {
    let value = match headers.get(AUTHORIZATION) {
        Some(v) => v.to_str().map_err(|_| Error::MalformedScheme)?,
        None => return Err(Error::MissingHeader),
    };
    if value.trim().is_empty() {
        return Err(Error::MissingHeader);
    }

    let has_prefix = value
        .get(..BEARER_PREFIX.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(BEARER_PREFIX));
    if !has_prefix {
        return Err(Error::MalformedScheme);
    }

    let token = value[BEARER_PREFIX.len()..].trim();
    if token.is_empty() {
        return Err(Error::EmptyCredential);
    }
    Ok(Secret::new(token.to_owned()))
}
