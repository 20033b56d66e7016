//! Deployment settings read from the process environment.

use std::{path::PathBuf, time::Duration};

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8787;
const DEFAULT_DATABASE_URL: &str = "sqlite://gallery.db";
const DEFAULT_STORAGE_ROOT: &str = "./storage";
const DEFAULT_BATCH_MIN_INTERVAL_MS: u64 = 1_000;
const DEFAULT_BATCH_COOLDOWN_SECS: u64 = 10;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub storage_root: PathBuf,
    /// Prefix of the public URLs handed out for stored images
    pub public_base_url: String,
    pub gateway_url: Option<String>,
    pub gateway_api_key: Option<SecretString>,
    pub image_model: Option<String>,
    pub batch_min_interval: Duration,
    pub batch_rate_limit_cooldown: Duration,
}

impl DeploymentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse(&var, "PORT", DEFAULT_PORT)?;
        let public_base_url = var("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://{host}:{port}"))
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            storage_root: var("STORAGE_ROOT")
                .unwrap_or_else(|| DEFAULT_STORAGE_ROOT.to_string())
                .into(),
            public_base_url,
            gateway_url: var("AI_GATEWAY_URL"),
            gateway_api_key: var("AI_GATEWAY_API_KEY").map(SecretString::from),
            image_model: var("IMAGE_MODEL"),
            batch_min_interval: Duration::from_millis(parse(
                &var,
                "BATCH_MIN_INTERVAL_MS",
                DEFAULT_BATCH_MIN_INTERVAL_MS,
            )?),
            batch_rate_limit_cooldown: Duration::from_secs(parse(
                &var,
                "BATCH_RATE_LIMIT_COOLDOWN_SECS",
                DEFAULT_BATCH_COOLDOWN_SECS,
            )?),
            host,
            port,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
