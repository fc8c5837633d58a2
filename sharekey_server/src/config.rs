//! Command-line and environment configuration

use std::{net::SocketAddr, time::Duration};

use aliri::jwt;
use clap::Parser;
use reqwest::Url;
use sharekey::{provision::DEFAULT_TOKEN_LIFETIME_SECS, ProvisioningConfig};
use sharekey_reqwest::{CatalogConfig, PersonalAccessToken};

/// Provisions data-sharing recipients for callers presenting identity tokens
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Opts {
    /// The base URL of the workspace hosting the recipient catalog
    #[arg(long, env = "DATABRICKS_URL")]
    pub databricks_url: Url,

    /// The personal access token used to authenticate to the catalog
    #[arg(long, env = "DATABRICKS_PAT", value_parser = access_token, hide_env_values = true)]
    pub databricks_pat: PersonalAccessToken,

    /// The issuer that identity tokens must come from
    #[arg(long, env = "COGNITO_ISSUER", value_parser = issuer)]
    pub cognito_issuer: jwt::Issuer,

    /// The address to listen on
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// How long tokens issued to new recipients remain valid, in seconds
    #[arg(long, env = "TOKEN_LIFETIME_SECS", default_value_t = DEFAULT_TOKEN_LIFETIME_SECS)]
    pub token_lifetime_secs: u64,

    /// How long a superseded token remains valid after rotation, in seconds
    #[arg(long, env = "ROTATION_GRACE_SECS", default_value_t = DEFAULT_TOKEN_LIFETIME_SECS)]
    pub rotation_grace_secs: u64,

    /// The timeout applied to each request to the catalog, in seconds
    #[arg(long, env = "CATALOG_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

impl Opts {
    /// Configuration for the catalog client
    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig::new(self.databricks_url.clone(), self.databricks_pat.clone())
    }

    /// Configuration for the provisioner
    pub fn provisioning_config(&self) -> ProvisioningConfig {
        ProvisioningConfig::new(self.cognito_issuer.clone())
            .with_token_lifetime(self.token_lifetime_secs)
            .with_rotation_grace(self.rotation_grace_secs)
    }

    /// The timeout applied to each request to the catalog
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn non_empty(value: &str) -> Result<&str, &'static str> {
    if value.trim().is_empty() {
        Err("value must not be empty")
    } else {
        Ok(value)
    }
}

fn access_token(value: &str) -> Result<PersonalAccessToken, &'static str> {
    non_empty(value).map(|v| PersonalAccessToken::new(v.to_owned()))
}

fn issuer(value: &str) -> Result<jwt::Issuer, &'static str> {
    non_empty(value).map(|v| jwt::Issuer::new(v.to_owned()))
}
