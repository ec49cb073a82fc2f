//! Per-call request descriptors

use crate::error::ClientError;
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;

/// One part of a multipart form
#[derive(Debug, Clone)]
enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        bytes: Vec<u8>,
        filename: String,
        mime: Option<String>,
    },
}

/// Multipart form body that can be rebuilt for a reissued request
#[derive(Debug, Clone, Default)]
pub struct FormPayload {
    parts: Vec<FormPart>,
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
        filename: impl Into<String>,
        mime: Option<&str>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            bytes: bytes.into(),
            filename: filename.into(),
            mime: mime.map(str::to_string),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub(crate) fn to_form(&self) -> Result<Form, ClientError> {
        let mut form = Form::new();
        for part in &self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
                FormPart::File {
                    name,
                    bytes,
                    filename,
                    mime,
                } => {
                    let mut file = Part::bytes(bytes.clone()).file_name(filename.clone());
                    if let Some(mime) = mime {
                        file = file.mime_str(mime)?;
                    }
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

/// Request body
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Form(FormPayload),
}

/// Describes one logical API call
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// Path appended verbatim to the base URL
    pub endpoint: String,
    pub method: Method,
    pub body: RequestBody,
    /// Refresh the access token and reissue once on 401
    pub refresh_on_unauthorized: bool,
}

impl ApiRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            body: RequestBody::Empty,
            refresh_on_unauthorized: true,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PUT, endpoint)
    }

    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PATCH, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Attach a multipart form body
    #[must_use]
    pub fn form(mut self, payload: FormPayload) -> Self {
        self.body = RequestBody::Form(payload);
        self
    }

    /// Fail on 401 instead of refreshing the access token
    #[must_use]
    pub fn without_refresh(mut self) -> Self {
        self.refresh_on_unauthorized = false;
        self
    }

    pub fn is_form(&self) -> bool {
        matches!(self.body, RequestBody::Form(_))
    }
}
