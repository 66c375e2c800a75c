use config::{Config as Cfg, Environment, File};
use secrecy::Secret;
use serde::Deserialize;
use service_core::error::AppError;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub zatca: ZatcaConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// ZATCA API credentials and limits. Injected into the client explicitly so
/// per-environment and per-test configurations never touch ambient state.
#[derive(Debug, Deserialize, Clone)]
pub struct ZatcaConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Bearer credential shared by all three authority endpoints.
    #[serde(default = "default_api_key")]
    pub api_key: Secret<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ZatcaConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: default_api_key(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3006
}

fn default_api_url() -> String {
    "https://gw-fatoora.zatca.gov.sa/e-invoicing/developer-portal".to_string()
}

fn default_api_key() -> Secret<String> {
    Secret::new(String::new())
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load from an optional `configuration` file plus `APP_`-prefixed
    /// environment variables (`__` separates nesting, e.g.
    /// `APP_ZATCA__API_KEY`).
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
