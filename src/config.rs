//! Relay configuration
//!
//! Built once at startup and shared with every request. Sources, later
//! overriding earlier:
//! - built-in defaults
//! - TOML file (`--config`, default `imgrelay.toml`, optional)
//! - `IMGRELAY_*` environment variables, `__` separating nested keys
//! - `GITHUB_OWNER` / `GITHUB_REPO` / `GITHUB_TOKEN`

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default upload body cap (32 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listen address
    pub bind_addr: SocketAddr,
    /// Largest accepted upload body in bytes
    pub max_upload_bytes: usize,
    pub store: StoreConfig,
    pub edge: EdgeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            store: StoreConfig::default(),
            edge: EdgeConfig::default(),
        }
    }
}

/// GitHub repository used as the blob store
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// API base URL
    pub api_url: String,
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Bearer token with contents write access
    pub token: String,
    /// User-Agent for store requests
    pub user_agent: String,
    /// Whole-request timeout for store calls
    pub timeout_secs: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            owner: String::new(),
            repo: String::new(),
            token: String::new(),
            user_agent: concat!("imgrelay/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: None,
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("api_url", &self.api_url)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("token", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Headers the edge proxy uses to describe the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    pub client_ip_header: String,
    pub country_header: String,
    pub city_header: String,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            client_ip_header: "cf-connecting-ip".to_string(),
            country_header: "cf-ipcountry".to_string(),
            city_header: "cf-ipcity".to_string(),
        }
    }
}

impl Config {
    /// Layered configuration sources
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("IMGRELAY_").split("__"))
            .merge(
                Env::raw()
                    .only(&["GITHUB_OWNER", "GITHUB_REPO", "GITHUB_TOKEN"])
                    .map(|key| {
                        if key.as_str().eq_ignore_ascii_case("GITHUB_OWNER") {
                            "store.owner".into()
                        } else if key.as_str().eq_ignore_ascii_case("GITHUB_REPO") {
                            "store.repo".into()
                        } else {
                            "store.token".into()
                        }
                    }),
            )
    }

    /// Load and validate configuration
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: Config = Self::figment(path).extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the relay cannot serve with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.owner.is_empty() {
            return Err(ConfigError::Invalid("store.owner is required".to_string()));
        }
        if self.store.repo.is_empty() {
            return Err(ConfigError::Invalid("store.repo is required".to_string()));
        }
        if self.store.token.is_empty() {
            return Err(ConfigError::Invalid("store.token is required".to_string()));
        }
        if !(self.store.api_url.starts_with("https://") || self.store.api_url.starts_with("http://"))
        {
            return Err(ConfigError::Invalid(format!(
                "store.api_url must be an http(s) URL, got {:?}",
                self.store.api_url
            )));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
