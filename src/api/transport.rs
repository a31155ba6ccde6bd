// Authenticated HTTP transport.
//
// Every request carries the configured `Authorization` header. 429s are
// retried under the configured backoff policy; any other non-success status
// fails unless the caller allow-listed it for that request.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info};

use super::retry::{with_retry, RetryPolicy};
use crate::config::Config;
use crate::error::{DramaError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// A file uploaded alongside a form (multipart body).
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// Form field name the server expects, usually `file`.
    pub field: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            field: "file".to_string(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// One API call, fully described before it is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    /// Form fields for POST. Ignored for GET.
    pub form: Vec<(String, String)>,
    pub attachment: Option<Attachment>,
    /// Non-success statuses that should still return the body.
    pub allowed_failures: Vec<u16>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            form: Vec::new(),
            attachment: None,
            allowed_failures: Vec::new(),
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(url)
        }
    }

    pub fn field(mut self, name: &str, value: impl ToString) -> Self {
        self.form.push((name.to_string(), value.to_string()));
        self
    }

    pub fn attachment(mut self, attachment: Option<Attachment>) -> Self {
        self.attachment = attachment;
        self
    }

    pub fn allow_failure(mut self, status: u16) -> Self {
        self.allowed_failures.push(status);
        self
    }

    /// Look up a form field by name.
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Something that can execute an `ApiRequest` and return decoded JSON.
///
/// `HttpTransport` is the real implementation; tests substitute an
/// in-memory one.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value>;
}

/// What to do with a response, judged on its status alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    Success,
    RateLimited,
    Failed,
}

/// Classify a status code against the request's allow-list.
pub fn classify_status(status: u16, allowed_failures: &[u16]) -> StatusOutcome {
    if status == StatusCode::TOO_MANY_REQUESTS.as_u16() {
        StatusOutcome::RateLimited
    } else if (200..300).contains(&status) || allowed_failures.contains(&status) {
        StatusOutcome::Success
    } else {
        StatusOutcome::Failed
    }
}

/// reqwest-backed transport used against the live site.
pub struct HttpTransport {
    client: Client,
    auth_token: String,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            auth_token: config.auth_token.clone(),
            retry: config.retry.clone(),
        })
    }

    async fn send_once(&self, request: &ApiRequest) -> Result<Value> {
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => {
                let builder = self.client.post(&request.url);
                match &request.attachment {
                    // Multipart bodies are rebuilt per attempt since a Form
                    // is consumed on send.
                    Some(attachment) => builder.multipart(multipart_form(request, attachment)?),
                    None => builder.form(&request.form),
                }
            }
        };

        let response = builder
            .header(reqwest::header::AUTHORIZATION, &self.auth_token)
            .send()
            .await?;

        let status = response.status().as_u16();
        info!(
            method = request.method.as_str(),
            url = %request.url,
            status,
            "{} {} ({})",
            request.method.as_str(),
            request.url,
            status
        );
        if request.method == Method::Post {
            let fields: Vec<&str> = request.form.iter().map(|(k, _)| k.as_str()).collect();
            debug!(fields = ?fields, has_file = request.attachment.is_some(), "POST form");
        }

        match classify_status(status, &request.allowed_failures) {
            StatusOutcome::RateLimited => Err(DramaError::RateLimited {
                method: request.method.as_str(),
                url: request.url.clone(),
            }),
            StatusOutcome::Failed => {
                let body = response.text().await.unwrap_or_default();
                Err(DramaError::RequestFailed {
                    method: request.method.as_str(),
                    url: request.url.clone(),
                    status,
                    body,
                })
            }
            StatusOutcome::Success => {
                let text = response.text().await?;
                decode_body(&text, status, request)
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        with_retry(&self.retry, || self.send_once(&request)).await
    }
}

fn multipart_form(request: &ApiRequest, attachment: &Attachment) -> Result<Form> {
    let mut form = Form::new();
    for (name, value) in &request.form {
        form = form.text(name.clone(), value.clone());
    }
    let part = Part::bytes(attachment.bytes.clone())
        .file_name(attachment.file_name.clone())
        .mime_str(&attachment.mime_type)?;
    Ok(form.part(attachment.field.clone(), part))
}

/// Decode a body the status check accepted.
///
/// Allow-listed failures often come back as HTML error pages; those decode
/// to `null` rather than failing the call.
fn decode_body(text: &str, status: u16, request: &ApiRequest) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(_) if request.allowed_failures.contains(&status) => Ok(Value::Null),
        Err(e) => Err(DramaError::UnexpectedResponse {
            url: request.url.clone(),
            detail: format!("body is not JSON: {e}"),
        }),
    }
}
