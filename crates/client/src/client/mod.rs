//! CampusConnect API client

pub mod auth;
pub mod request;
pub mod users;

pub use request::{ApiRequest, FormPayload, RequestBody};

use crate::config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_REFRESH_ENDPOINT};
use crate::error::ClientError;
use crate::session::{Session, SessionExpiredHook};
use crate::storage::{MemoryTokenStore, StorageKeys, TokenStore};
use crate::types::{Envelope, RefreshRequest, RefreshResponse};
use reqwest::{Client, ClientBuilder, Response, StatusCode, header};
use serde::Serialize;
use serde::de::{Deserialize, DeserializeOwned};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Where a logical call is in its request/refresh/reissue sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Retried,
}

/// Authenticated CampusConnect API client
#[derive(Clone)]
pub struct CampusClient {
    client: Client,
    base_url: String,
    refresh_endpoint: String,
    session: Arc<Session>,
}

impl CampusClient {
    /// Create a client with in-memory token storage
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    pub fn builder() -> CampusClientBuilder {
        CampusClientBuilder::default()
    }

    /// Create a client from loaded configuration
    pub fn from_config(
        config: &ClientConfig,
        store: Arc<dyn TokenStore>,
    ) -> Result<Self, ClientError> {
        let mut builder = Self::builder()
            .base_url(config.base_url.clone())
            .refresh_endpoint(config.refresh_endpoint.clone())
            .token_store(store)
            .storage_keys(config.storage.keys.clone());

        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }

        builder.build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Build one HTTP attempt for `request`
    fn build_request(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<reqwest::RequestBuilder, ClientError> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.endpoint));

        builder = match &request.body {
            RequestBody::Form(payload) => builder.multipart(payload.to_form()?),
            RequestBody::Json(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(serde_json::to_vec(value)?),
            RequestBody::Empty => builder.header(header::CONTENT_TYPE, "application/json"),
        };

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        Ok(builder)
    }

    /// Execute a request, refreshing the access token at most once
    ///
    /// A 401 on the first attempt triggers one refresh followed by one
    /// reissue. A 401 on the reissue, or a failed refresh, clears the stored
    /// credentials and fails with [`ClientError::SessionExpired`].
    /// A 204 response deserializes `T` from JSON `null`.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let mut attempt = Attempt::First;

        loop {
            let token = self.session.access_token().await?;
            debug!(
                method = %request.method,
                endpoint = %request.endpoint,
                ?attempt,
                authenticated = token.is_some(),
                "Sending API request"
            );

            let response = self
                .build_request(&request, token.as_deref())?
                .send()
                .await?;

            if response.status() == StatusCode::UNAUTHORIZED {
                match attempt {
                    Attempt::First if request.refresh_on_unauthorized => {
                        if let Err(e) = self.refresh_after(token.as_deref()).await {
                            return Err(self.expire(format!("token refresh failed: {e}")).await);
                        }
                        attempt = Attempt::Retried;
                        continue;
                    }
                    Attempt::Retried => {
                        return Err(self
                            .expire("request rejected after token refresh".to_string())
                            .await);
                    }
                    Attempt::First => {}
                }
            }

            return read_response(response).await;
        }
    }

    /// Send a GET request
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ClientError> {
        self.send(ApiRequest::get(endpoint)).await
    }

    /// Send a POST request with a JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(ApiRequest::post(endpoint).json(body)?).await
    }

    /// Send a PUT request with a JSON body
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(ApiRequest::put(endpoint).json(body)?).await
    }

    /// Send a PATCH request with a JSON body
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(ApiRequest::patch(endpoint).json(body)?).await
    }

    /// Send a DELETE request
    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ClientError> {
        self.send(ApiRequest::delete(endpoint)).await
    }

    /// Refresh through the session guard after `stale` was rejected
    async fn refresh_after(&self, stale: Option<&str>) -> Result<String, ClientError> {
        self.session
            .refresh_with(stale, |refresh_token| {
                self.request_access_token(refresh_token)
            })
            .await
    }

    /// Exchange a refresh token for a new access token
    ///
    /// Sent with JSON headers only: the access token is presumed invalid.
    async fn request_access_token(&self, refresh_token: String) -> Result<String, ClientError> {
        debug!(endpoint = %self.refresh_endpoint, "Refreshing access token");

        let body = serde_json::to_vec(&RefreshRequest::new(refresh_token))?;
        let response = self
            .client
            .post(self.url(&self.refresh_endpoint))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Refresh endpoint answered {status}");
            return Err(ClientError::RefreshFailed {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        let refreshed: Envelope<RefreshResponse> = serde_json::from_slice(&bytes)?;
        Ok(refreshed.into_inner().access)
    }

    /// Drop stored credentials and build the session-expired error
    async fn expire(&self, reason: String) -> ClientError {
        warn!("Session expired: {reason}");
        if let Err(e) = self.session.clear().await {
            warn!("Failed to clear stored credentials: {e}");
        }
        self.session.notify_expired();
        ClientError::SessionExpired(reason)
    }
}

/// Map a final response to the caller's result
async fn read_response<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_else(|_| status.to_string());
        return Err(ClientError::from_status(status, body));
    }

    if status == StatusCode::NO_CONTENT {
        return Ok(T::deserialize(Value::Null)?);
    }

    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Builder for CampusClient
#[derive(Default)]
pub struct CampusClientBuilder {
    base_url: Option<String>,
    refresh_endpoint: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    store: Option<Arc<dyn TokenStore>>,
    keys: Option<StorageKeys>,
    on_session_expired: Option<SessionExpiredHook>,
}

impl CampusClientBuilder {
    /// Set the base URL; endpoints are appended to it as-is
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Use the build-time default base URL
    #[must_use]
    pub fn default_base_url(self) -> Self {
        self.base_url(DEFAULT_BASE_URL)
    }

    #[must_use]
    pub fn refresh_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.refresh_endpoint = Some(endpoint.into());
        self
    }

    /// Set a client-wide request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set the credential store (in-memory by default)
    #[must_use]
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn storage_keys(mut self, keys: StorageKeys) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Called whenever a request fails with a session-expired error
    #[must_use]
    pub fn on_session_expired(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_session_expired = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<CampusClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        url::Url::parse(&base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid base_url {base_url}: {e}")))?;

        let mut client_builder = ClientBuilder::new().cookie_store(true);

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        client_builder = client_builder.user_agent(
            self.user_agent
                .unwrap_or_else(|| format!("campus-client/{}", env!("CARGO_PKG_VERSION"))),
        );

        let client = client_builder.build()?;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryTokenStore::new()));
        let mut session = Session::new(store).with_keys(self.keys.unwrap_or_default());
        if let Some(hook) = self.on_session_expired {
            session = session.on_session_expired(hook);
        }

        Ok(CampusClient {
            client,
            base_url,
            refresh_endpoint: self
                .refresh_endpoint
                .unwrap_or_else(|| DEFAULT_REFRESH_ENDPOINT.to_string()),
            session: Arc::new(session),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_base_url() {
        let result = CampusClient::builder().build();
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[test]
    fn test_builder_rejects_invalid_base_url() {
        let result = CampusClient::builder().base_url("not a url").build();
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[test]
    fn test_endpoint_is_appended_verbatim() {
        let client = CampusClient::new("http://localhost:8000/api/v1/").unwrap();
        assert_eq!(
            client.url("users/profile/"),
            "http://localhost:8000/api/v1/users/profile/"
        );
        assert_eq!(client.refresh_endpoint, "auth/refresh/");
    }

    #[tokio::test]
    async fn test_from_config_uses_configured_keys() {
        let mut config = ClientConfig::default();
        config.base_url = "http://localhost:9000/".into();
        config.storage.keys.access = "cc_access".into();

        let store = Arc::new(MemoryTokenStore::with_entries([("cc_access", "A1")]));
        let client = CampusClient::from_config(&config, store).unwrap();

        assert_eq!(client.base_url(), "http://localhost:9000/");
        assert_eq!(
            client.session().access_token().await.unwrap().as_deref(),
            Some("A1")
        );
    }
}
