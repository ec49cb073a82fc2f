//! CampusConnect API client
//!
//! An HTTP client for the CampusConnect REST API that injects bearer
//! credentials from a [`TokenStore`] and transparently renews an expired
//! access token once per call.

pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod state_dir;
pub mod storage;
pub mod types;

pub use client::{ApiRequest, CampusClient, CampusClientBuilder, FormPayload, RequestBody};
pub use config::ClientConfig;
pub use error::ClientError;
pub use session::{Credentials, Session};
pub use state_dir::StateDir;
pub use storage::{FileTokenStore, MemoryTokenStore, StorageKeys, TokenStore};
