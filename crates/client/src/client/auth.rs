//! Authentication API client methods

use super::{ApiRequest, CampusClient};
use crate::error::ClientError;
use crate::session::Credentials;
use crate::types::{
    Envelope, LoginRequest, LoginResponse, LogoutRequest, RegisterRequest, RegisterResponse,
    VerifyEmailRequest,
};
use serde_json::Value;
use tracing::{debug, info};

impl CampusClient {
    /// Log in and persist the returned credential pair
    pub async fn login(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<LoginResponse, ClientError> {
        let request = ApiRequest::post("auth/login/")
            .json(&LoginRequest {
                email: email.into(),
                password: password.into(),
            })?
            .without_refresh();

        let response = self
            .send::<Envelope<LoginResponse>>(request)
            .await?
            .into_inner();

        self.session
            .store_credentials(&Credentials::new(&response.access, &response.refresh))
            .await?;
        info!("Logged in, credentials stored");

        Ok(response)
    }

    /// Register a new account
    ///
    /// Credentials are stored only when the server returns both tokens.
    pub async fn register(
        &self,
        registration: &RegisterRequest,
    ) -> Result<RegisterResponse, ClientError> {
        let request = ApiRequest::post("auth/register/")
            .json(registration)?
            .without_refresh();

        let response = self
            .send::<Envelope<RegisterResponse>>(request)
            .await?
            .into_inner();

        if let (Some(access), Some(refresh)) = (&response.access, &response.refresh) {
            self.session
                .store_credentials(&Credentials::new(access, refresh))
                .await?;
            info!("Registered and logged in, credentials stored");
        } else {
            debug!(
                verification_required = response.verification_required,
                "Registered without a session"
            );
        }

        Ok(response)
    }

    /// Confirm an e-mail address with the link parameters from the verification mail
    pub async fn verify_email(
        &self,
        uid: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Value, ClientError> {
        let request = ApiRequest::post("auth/verify-email/")
            .json(&VerifyEmailRequest {
                uid: uid.into(),
                token: token.into(),
            })?
            .without_refresh();
        self.send(request).await
    }

    /// Revoke the session server-side and drop local credentials
    ///
    /// Local credentials are cleared even when the server call fails; the
    /// server error is still returned.
    pub async fn logout(&self) -> Result<(), ClientError> {
        if self.session.access_token().await?.is_none() {
            self.session.clear().await?;
            return Ok(());
        }

        let request = ApiRequest::post("auth/logout/")
            .json(&LogoutRequest {
                refresh_token: self.session.refresh_token().await?,
            })?
            .without_refresh();

        let result = self.send::<Value>(request).await;
        self.session.clear().await?;
        info!("Logged out, credentials cleared");

        result.map(|_| ())
    }

    /// Exchange the stored refresh token for a new access token
    ///
    /// Fails with [`ClientError::RefreshUnavailable`] when no refresh token is
    /// stored. Any failure clears both stored tokens.
    pub async fn refresh_access_token(&self) -> Result<String, ClientError> {
        let current = self.session.access_token().await?;
        self.refresh_after(current.as_deref()).await
    }
}
