//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! `AZURE_TENANT_ID` and `AZURE_CLIENT_ID` override the `[azure_ad]` values
//! so the same file can be promoted across tenants.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub azure_ad: AzureAdConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub downstream: DownstreamConfig,
    #[serde(default)]
    pub consent: ConsentConfig,
}

/// App registration used to build consent URLs
#[derive(Debug, Deserialize)]
pub struct AzureAdConfig {
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_authority")]
    pub authority: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Externally visible base URL; overrides Host-derived redirect URIs
    #[serde(default)]
    pub public_base_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Protected API the caller's token is relayed to
#[derive(Debug, Deserialize)]
pub struct DownstreamConfig {
    #[serde(default = "default_downstream_url")]
    pub url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Pending consent correlation settings
#[derive(Debug, Deserialize)]
pub struct ConsentConfig {
    #[serde(default = "default_pending_ttl")]
    pub pending_ttl_secs: u64,
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            url: default_downstream_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            pending_ttl_secs: default_pending_ttl(),
            max_pending: default_max_pending(),
        }
    }
}

fn default_authority() -> String {
    consent_auth::DEFAULT_AUTHORITY.to_string()
}

fn default_scopes() -> Vec<String> {
    vec![consent_auth::DEFAULT_SCOPE.to_string()]
}

fn default_max_connections() -> usize {
    1000
}

fn default_downstream_url() -> String {
    "https://graph.microsoft.com/v1.0/me".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_pending_ttl() -> u64 {
    600
}

fn default_max_pending() -> usize {
    consent_auth::MAX_PENDING_CONSENTS
}

impl Config {
    /// Load configuration from a TOML file, overlay environment variables, validate.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(tenant) = std::env::var("AZURE_TENANT_ID") {
            config.azure_ad.tenant_id = tenant;
        }
        if let Ok(client) = std::env::var("AZURE_CLIENT_ID") {
            config.azure_ad.client_id = client;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if self.azure_ad.tenant_id.trim().is_empty() {
            return Err(common::Error::blank("azure_ad.tenant_id"));
        }
        if self.azure_ad.client_id.trim().is_empty() {
            return Err(common::Error::blank("azure_ad.client_id"));
        }

        if !self.downstream.url.starts_with("http://")
            && !self.downstream.url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "downstream.url must start with http:// or https://, got: {}",
                self.downstream.url
            )));
        }

        if self.downstream.timeout_secs == 0 {
            return Err(common::Error::Config(
                "downstream.timeout_secs must be greater than 0".into(),
            ));
        }

        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "server.max_connections must be greater than 0".into(),
            ));
        }

        if self.consent.pending_ttl_secs == 0 {
            return Err(common::Error::Config(
                "consent.pending_ttl_secs must be greater than 0".into(),
            ));
        }

        if self.consent.max_pending == 0 {
            return Err(common::Error::Config(
                "consent.max_pending must be greater than 0".into(),
            ));
        }

        if let Some(base) = &self.server.public_base_url
            && !base.starts_with("http://")
            && !base.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "server.public_base_url must start with http:// or https://, got: {base}"
            )));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("consent-gateway.toml")
    }
}
