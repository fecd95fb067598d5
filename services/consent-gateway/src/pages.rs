//! HTML status pages for the browser-facing callback
//!
//! Markup lives in `templates/`; askama escapes every interpolated value.

use askama::Template;

/// Served if a template fails to render.
const FALLBACK_PAGE: &str = concat!(
    "<!DOCTYPE html>\n",
    "<html><body><h1>Authentication Error</h1></body></html>\n",
);

#[derive(Template)]
#[template(path = "callback_success.html")]
struct SuccessPage;

#[derive(Template)]
#[template(path = "callback_error.html")]
struct ErrorPage<'a> {
    message: &'a str,
    description: Option<&'a str>,
}

fn render(page: &impl Template) -> String {
    page.render().unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to render callback page");
        FALLBACK_PAGE.to_string()
    })
}

/// Page shown after the identity provider returned an authorization code.
pub fn success() -> String {
    render(&SuccessPage)
}

/// Page shown for a provider error or a malformed callback.
pub fn error(message: &str, description: Option<&str>) -> String {
    render(&ErrorPage {
        message,
        description,
    })
}
