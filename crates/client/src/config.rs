//! Client configuration

use crate::error::ClientError;
use crate::storage::StorageKeys;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Base URL baked in at build time, falling back to the local dev server
pub const DEFAULT_BASE_URL: &str = match option_env!("CAMPUS_API_URL") {
    Some(url) => url,
    None => "http://localhost:8000/api/v1/",
};

/// Relative path of the token refresh endpoint
pub const DEFAULT_REFRESH_ENDPOINT: &str = "auth/refresh/";

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API base URL, endpoints are appended verbatim
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Refresh endpoint, relative to the base URL
    #[serde(default = "default_refresh_endpoint")]
    pub refresh_endpoint: String,
    /// Client-wide request timeout in seconds (none by default)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Token storage settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Token storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Token file location (defaults to the platform data directory)
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Storage key names
    #[serde(default)]
    pub keys: StorageKeys,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_refresh_endpoint() -> String {
    DEFAULT_REFRESH_ENDPOINT.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            refresh_endpoint: default_refresh_endpoint(),
            timeout_secs: None,
            user_agent: None,
            storage: StorageConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from well-known files and `CAMPUS__*` variables
    pub fn load() -> Result<Self, ClientError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        let config_paths = ["campus.toml", "config/campus.toml"];
        for path in &config_paths {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("CAMPUS")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load configuration from a specific file; environment still overrides it
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let builder = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix("CAMPUS")
                    .separator("__")
                    .try_parsing(true),
            );

        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
