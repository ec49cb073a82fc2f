//! Durable key-value storage for credentials

mod file;
mod memory;

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

use crate::error::ClientError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Key-value store holding the credential pair
///
/// Implementations must not cache values across calls: every `get` observes
/// the latest write, including writes made by other clients sharing the
/// same backing storage.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<String>, ClientError>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;

    /// Remove all given keys in a single operation
    async fn remove(&self, keys: &[&str]) -> Result<(), ClientError>;
}

/// Names of the two storage entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageKeys {
    #[serde(default = "default_access_key")]
    pub access: String,
    #[serde(default = "default_refresh_key")]
    pub refresh: String,
}

fn default_access_key() -> String {
    "access_token".to_string()
}

fn default_refresh_key() -> String {
    "refresh_token".to_string()
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            access: default_access_key(),
            refresh: default_refresh_key(),
        }
    }
}
