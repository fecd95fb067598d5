//! Redirect URI derivation from the inbound request

use reqwest::header::{HOST, HeaderMap};

use crate::constants::CALLBACK_PATH;

/// Resolve the callback URL the identity provider should redirect to.
///
/// A configured `public_base_url` wins. Otherwise the URL is rebuilt from
/// `X-Forwarded-Host`/`Host` and `X-Forwarded-Proto`; loopback hosts default
/// to `http`, everything else to `https`.
pub fn redirect_uri(headers: &HeaderMap, public_base_url: Option<&str>) -> String {
    if let Some(base) = public_base_url.map(str::trim).filter(|b| !b.is_empty()) {
        return format!("{}{CALLBACK_PATH}", base.trim_end_matches('/'));
    }

    let host = header_str(headers, "x-forwarded-host")
        .or_else(|| header_str(headers, HOST.as_str()))
        .unwrap_or("localhost");
    let scheme = header_str(headers, "x-forwarded-proto").unwrap_or(if is_loopback(host) {
        "http"
    } else {
        "https"
    });

    format!("{scheme}://{host}{CALLBACK_PATH}")
}

/// First comma-separated value of a header, trimmed, if non-empty.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn is_loopback(host: &str) -> bool {
    let name = if host.starts_with('[') {
        host.find(']').map_or(host, |end| &host[..=end])
    } else {
        host.split(':').next().unwrap_or(host)
    };
    matches!(name, "localhost" | "127.0.0.1" | "[::1]")
}
