//! User profile client methods

use super::{ApiRequest, CampusClient, FormPayload};
use crate::error::ClientError;
use crate::types::{ChangePasswordRequest, Envelope, Institution, ProfileUpdate};
use serde_json::Value;

impl CampusClient {
    /// Current user's profile
    pub async fn profile(&self) -> Result<Value, ClientError> {
        let response: Envelope<Value> = self.get("users/profile/").await?;
        Ok(response.into_inner())
    }

    /// Update editable profile fields
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Value, ClientError> {
        let response: Envelope<Value> = self.put("users/profile/", update).await?;
        Ok(response.into_inner())
    }

    /// Upload a new profile picture as a multipart form
    pub async fn upload_profile_picture(
        &self,
        bytes: Vec<u8>,
        filename: impl Into<String>,
        mime: Option<&str>,
    ) -> Result<Value, ClientError> {
        let payload = FormPayload::new().file("profile_picture", bytes, filename, mime);
        let response: Envelope<Value> = self
            .send(ApiRequest::put("users/profile/").form(payload))
            .await?;
        Ok(response.into_inner())
    }

    /// Another user's public profile
    pub async fn public_profile(&self, user_id: i64) -> Result<Value, ClientError> {
        let response: Envelope<Value> = self.get(&format!("users/{user_id}/")).await?;
        Ok(response.into_inner())
    }

    pub async fn change_password(
        &self,
        old_password: impl Into<String>,
        new_password: impl Into<String>,
    ) -> Result<(), ClientError> {
        let new_password = new_password.into();
        let request = ChangePasswordRequest {
            old_password: old_password.into(),
            new_password_confirm: new_password.clone(),
            new_password,
        };
        let _: Value = self.put("users/change-password/", &request).await?;
        Ok(())
    }

    /// Institutions available at registration
    pub async fn institutions(&self) -> Result<Vec<Institution>, ClientError> {
        let response: Envelope<Vec<Institution>> = self.get("users/institutions/").await?;
        Ok(response.into_inner())
    }
}
