//! Startup and configuration errors

use thiserror::Error;

/// Errors raised while loading gateway configuration.
///
/// All of these are fatal: the gateway refuses to start rather than serve
/// consent URLs built from a partial tenant or client identity.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Shorthand for a required setting that is absent or blank.
    pub fn blank(field: &str) -> Self {
        Self::Config(format!("{field} must not be blank"))
    }
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_the_field() {
        let err = Error::blank("azure_ad.tenant_id");
        assert_eq!(
            err.to_string(),
            "Configuration error: azure_ad.tenant_id must not be blank"
        );
    }

    #[test]
    fn io_error_converts_with_prefix() {
        let err: Error =
            std::io::Error::new(std::io::ErrorKind::NotFound, "consent-gateway.toml").into();
        assert!(err.to_string().starts_with("I/O error:"), "got: {err}");
    }

    #[test]
    fn toml_error_converts() {
        let parse = toml::from_str::<toml::Table>("tenant_id = ").unwrap_err();
        let err: Error = parse.into();
        assert!(matches!(err, Error::Toml(_)));
    }
}
