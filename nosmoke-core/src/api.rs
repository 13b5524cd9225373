//! Typed client for the detection backend's HTTP API.

use std::time::Duration;

use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{DetectionRecord, NewDetection, NewStudent, Student, StudentPatch, User};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("could not reach the backend: {0}")]
    Network(String),

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("unexpected response from the backend: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
}

/// Auth endpoints either wrap the user or return it bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AuthEnvelope {
    Wrapped {
        user: User,
        #[serde(default, alias = "access_token")]
        token: Option<String>,
    },
    Bare(User),
}

impl AuthEnvelope {
    fn into_user(self) -> User {
        match self {
            AuthEnvelope::Wrapped { mut user, token } => {
                if user.token.is_none() {
                    user.token = token;
                }
                user
            }
            AuthEnvelope::Bare(user) => user,
        }
    }
}

/// Clone is cheap (reqwest's client is an Arc internally).
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base = Url::parse(base_url.trim())
            .map_err(|e| ApiError::Network(format!("invalid backend URL {base_url:?}: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self { http, base })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(&config.api_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// Build `<base>/<segments...>` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    // ── Students ──

    pub async fn list_students(&self) -> Result<Vec<Student>, ApiError> {
        let resp = self.send(self.http.get(self.endpoint(&["students"]))).await?;
        decode(resp).await
    }

    pub async fn create_student(&self, student: &NewStudent) -> Result<Student, ApiError> {
        let resp = self
            .send(self.http.post(self.endpoint(&["students"])).json(student))
            .await?;
        decode(resp).await
    }

    pub async fn update_student(&self, id: &str, patch: &StudentPatch) -> Result<(), ApiError> {
        self.send(self.http.put(self.endpoint(&["students", id])).json(patch))
            .await?;
        Ok(())
    }

    pub async fn delete_student(&self, id: &str) -> Result<(), ApiError> {
        self.send(self.http.delete(self.endpoint(&["students", id])))
            .await?;
        Ok(())
    }

    // ── Detections ──

    pub async fn list_detections(&self) -> Result<Vec<DetectionRecord>, ApiError> {
        let resp = self.send(self.http.get(self.endpoint(&["database"]))).await?;
        decode(resp).await
    }

    pub async fn create_detection(&self, detection: &NewDetection) -> Result<DetectionRecord, ApiError> {
        let resp = self
            .send(self.http.post(self.endpoint(&["database"])).json(detection))
            .await?;
        decode(resp).await
    }

    // ── Auth ──

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let body = SignInRequest { email, password };
        let resp = self
            .send(self.http.post(self.endpoint(&["auth", "signin"])).json(&body))
            .await?;
        decode::<AuthEnvelope>(resp).await.map(AuthEnvelope::into_user)
    }

    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<User, ApiError> {
        let body = SignUpRequest { email, password, name };
        let resp = self
            .send(self.http.post(self.endpoint(&["auth", "signup"])).json(&body))
            .await?;
        decode::<AuthEnvelope>(resp).await.map(AuthEnvelope::into_user)
    }

    // ── Evidence ──

    pub fn screenshot_url(&self, filename: &str) -> String {
        self.endpoint(&["screenshots", screenshot_name(filename)]).to_string()
    }

    pub async fn download_screenshot(&self, filename: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.endpoint(&["screenshots", screenshot_name(filename)]);
        let resp = self.send(self.http.get(url)).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, ApiError> {
        let resp = request.send().await.map_err(|e| {
            warn!(error = %e, "backend request failed");
            ApiError::Network(e.to_string())
        })?;
        debug!(url = %resp.url(), status = resp.status().as_u16(), "backend response");
        check(resp).await
    }
}

/// The backend stores screenshot paths like `screenshots/abc.jpg`; only
/// the file name goes in the URL.
fn screenshot_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

async fn check(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
    });
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Pull the human-readable reason out of an error body. Understands
/// FastAPI's `detail` (string or validation list), `message` and `error`.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for key in ["detail", "message", "error"] {
        match value.get(key) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(serde_json::Value::Array(items)) => {
                let parts: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .collect();
                if !parts.is_empty() {
                    return Some(parts.join("; "));
                }
            }
            _ => {}
        }
    }
    None
}
