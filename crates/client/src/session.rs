//! Session context: credential storage plus the refresh guard
//!
//! The client never holds tokens itself. Every attempt reads the current
//! access token through the session, and every refresh goes through
//! [`Session::refresh_with`], which lets only one refresh run at a time.

use crate::error::ClientError;
use crate::storage::{StorageKeys, TokenStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Access/refresh token pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Callback fired when a call fails with [`ClientError::SessionExpired`]
pub type SessionExpiredHook = Arc<dyn Fn() + Send + Sync>;

/// Shared session state for one logged-in user
pub struct Session {
    store: Arc<dyn TokenStore>,
    keys: StorageKeys,
    refresh_guard: Mutex<()>,
    on_expired: Option<SessionExpiredHook>,
}

impl Session {
    /// Create a session over a token store using the default keys
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            keys: StorageKeys::default(),
            refresh_guard: Mutex::new(()),
            on_expired: None,
        }
    }

    /// Use custom storage keys
    #[must_use]
    pub fn with_keys(mut self, keys: StorageKeys) -> Self {
        self.keys = keys;
        self
    }

    /// Register a session-expired callback
    #[must_use]
    pub fn on_session_expired(mut self, hook: SessionExpiredHook) -> Self {
        self.on_expired = Some(hook);
        self
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub async fn access_token(&self) -> Result<Option<String>, ClientError> {
        self.store.get(&self.keys.access).await
    }

    pub async fn refresh_token(&self) -> Result<Option<String>, ClientError> {
        self.store.get(&self.keys.refresh).await
    }

    /// Both tokens, if both are stored
    pub async fn credentials(&self) -> Result<Option<Credentials>, ClientError> {
        let access = self.access_token().await?;
        let refresh = self.refresh_token().await?;
        Ok(access
            .zip(refresh)
            .map(|(access_token, refresh_token)| Credentials {
                access_token,
                refresh_token,
            }))
    }

    pub async fn store_credentials(&self, credentials: &Credentials) -> Result<(), ClientError> {
        self.store
            .set(&self.keys.access, &credentials.access_token)
            .await?;
        self.store
            .set(&self.keys.refresh, &credentials.refresh_token)
            .await
    }

    pub async fn set_access_token(&self, token: &str) -> Result<(), ClientError> {
        self.store.set(&self.keys.access, token).await
    }

    /// Remove both tokens in one store operation
    pub async fn clear(&self) -> Result<(), ClientError> {
        self.store
            .remove(&[self.keys.access.as_str(), self.keys.refresh.as_str()])
            .await
    }

    pub(crate) fn notify_expired(&self) {
        if let Some(hook) = &self.on_expired {
            hook();
        }
    }

    /// Obtain a fresh access token after `stale` was rejected
    ///
    /// Concurrent callers queue on the refresh guard. Whoever gets the guard
    /// first runs `refresher` with the stored refresh token; the others find
    /// a stored access token that differs from their stale one and return it
    /// without another round trip. On any failure both tokens are cleared
    /// before the guard is released.
    pub async fn refresh_with<F, Fut>(
        &self,
        stale: Option<&str>,
        refresher: F,
    ) -> Result<String, ClientError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<String, ClientError>>,
    {
        let _guard = self.refresh_guard.lock().await;

        if let Some(current) = self.access_token().await? {
            if stale != Some(current.as_str()) {
                debug!("Access token was already refreshed by a concurrent call");
                return Ok(current);
            }
        }

        let result = async {
            let refresh_token = self
                .refresh_token()
                .await?
                .ok_or(ClientError::RefreshUnavailable)?;
            let access = refresher(refresh_token).await?;
            self.set_access_token(&access).await?;
            Ok::<_, ClientError>(access)
        }
        .await;

        if let Err(e) = &result {
            warn!("Token refresh failed, clearing stored credentials: {e}");
            if let Err(clear_err) = self.clear().await {
                warn!("Failed to clear stored credentials: {clear_err}");
            }
        }

        result
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("keys", &self.keys)
            .field("on_expired", &self.on_expired.is_some())
            .finish_non_exhaustive()
    }
}
