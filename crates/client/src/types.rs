//! Request and response types for the CampusConnect API

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response body that is either bare or wrapped in the API envelope
///
/// The backend wraps payloads as `{success, data, message, errors, meta}`;
/// some deployments return the payload directly. Only an object carrying
/// both `success` and `data` counts as wrapped, so a bare payload with its
/// own `data` field is returned whole.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped {
        success: bool,
        data: T,
    },
    Bare(T),
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data, .. } | Self::Bare(data) => data,
        }
    }
}

/// Body sent to the refresh endpoint
///
/// The token goes out under both `refresh` and `refresh_token`, the names
/// used by plain simplejwt and by the CampusConnect backend respectively.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest {
    pub refresh: String,
    pub refresh_token: String,
}

impl RefreshRequest {
    pub fn new(token: impl Into<String>) -> Self {
        let refresh = token.into();
        Self {
            refresh_token: refresh.clone(),
            refresh,
        }
    }
}

/// New access token returned by the refresh endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    #[serde(alias = "access_token")]
    pub access: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Tokens and user summary returned by a successful login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(alias = "access_token")]
    pub access: String,
    #[serde(alias = "refresh_token")]
    pub refresh: String,
    #[serde(default)]
    pub user: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub institution_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graduation_year: Option<i32>,
}

/// Registration outcome; tokens are present only when the server logs the
/// new account in immediately
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub verification_required: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "access_token")]
    pub access: Option<String>,
    #[serde(default, alias = "refresh_token")]
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyEmailRequest {
    pub uid: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoutRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

/// Editable profile fields; unset fields are left untouched by the server
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graduation_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dorm_building: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    pub id: i64,
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub logo: Option<String>,
}
