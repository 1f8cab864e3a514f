//! Authenticated HTTP client for the document Q&A backend
//!
//! Every call attaches the current bearer credential from the injected
//! [`TokenSource`] and tolerates a narrow race: the credential can expire
//! and be refreshed out-of-band at roughly the same time a request is made.
//!
//! # Retry policy
//!
//! A failed attempt is retried at most ONCE (two attempts total), and only
//! under two conditions:
//!
//! 1. The response status is 401: wait a short fixed delay so a concurrent
//!    credential refresh can land, then reissue with whatever token is
//!    current.
//! 2. The transport itself fails with a non-cancellation network error:
//!    wait the same delay and reissue once.
//!
//! Explicit cancellation is never retried; it propagates immediately as
//! [`AskdeskError::Cancelled`] regardless of remaining retry budget.

pub mod types;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::auth::TokenSource;
use crate::error::{AskdeskError, Result};

/// Fixed delay before the single retry, long enough for an out-of-band
/// token refresh to complete.
pub const RETRY_DELAY: Duration = Duration::from_millis(350);

/// Response header carrying the backend's correlation id.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Authenticated request client.
///
/// Stateless per call: the only shared state is the injected credential
/// source, which the client reads and never mutates (aside from asking it
/// to re-read its backing store before a retry).
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
    /// Per-request timeout for non-cancellable calls. Cancellable calls
    /// (the ask endpoint) are unbounded; a hung answer is resolved by
    /// explicit user cancellation.
    timeout: Duration,
}

impl ApiClient {
    /// Create a new client against `base_url`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Backend base URL, no trailing slash
    /// * `tokens` - Credential source read at call time
    /// * `timeout` - Timeout applied to non-cancellable requests
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("askdesk/0.2.0")
            .build()
            .map_err(|e| AskdeskError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue a request with the retry policy described in the module docs.
    ///
    /// `build` constructs a fresh request for each attempt (request bodies
    /// are not reusable across attempts); the current bearer token is
    /// attached afterwards.
    async fn send_with_retry<F>(
        &self,
        build: F,
        cancel: Option<&CancellationToken>,
    ) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut token = self.tokens.current().await;
        let mut retried = false;

        loop {
            let mut request = build();
            if let Some(t) = token.as_deref() {
                request = request.bearer_auth(t);
            }
            if cancel.is_none() {
                request = request.timeout(self.timeout);
            }

            let outcome = match cancel {
                Some(c) => tokio::select! {
                    () = c.cancelled() => return Err(AskdeskError::Cancelled.into()),
                    r = request.send() => r,
                },
                None => request.send().await,
            };

            match outcome {
                Ok(response) if response.status() == StatusCode::UNAUTHORIZED && !retried => {
                    retried = true;
                    tracing::warn!(
                        "Request returned 401 Unauthorized; retrying once after {}ms in case a credential refresh is in flight",
                        RETRY_DELAY.as_millis()
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                    token = self.tokens.refresh().await;
                }
                Ok(response) => return Ok(response),
                Err(e) => {
                    // A cancelled call can surface as a transport error when
                    // the connection is torn down before the select arm fires.
                    if cancel.is_some_and(CancellationToken::is_cancelled) {
                        return Err(AskdeskError::Cancelled.into());
                    }
                    if retried {
                        return Err(AskdeskError::Http(e).into());
                    }
                    retried = true;
                    tracing::warn!(
                        "Request failed ({}); retrying once after {}ms",
                        e,
                        RETRY_DELAY.as_millis()
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                    token = self.tokens.refresh().await;
                }
            }
        }
    }

    /// Resolve a final response: 204 to `None`, other 2xx to the body text,
    /// anything else to a structured error.
    async fn handle_response(response: reqwest::Response) -> Result<Option<String>> {
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if status.is_success() {
            return Ok(Some(response.text().await.map_err(AskdeskError::Http)?));
        }

        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = response.text().await.unwrap_or_default();
        let message = extract_detail(&body).unwrap_or_else(|| "Request failed".to_string());

        if status == StatusCode::UNAUTHORIZED {
            return Err(AskdeskError::Authentication(message).into());
        }
        Err(AskdeskError::Api {
            message,
            status: status.as_u16(),
            request_id,
        }
        .into())
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Option<String>> {
        let url = self.url(path);
        let response = self
            .send_with_retry(
                || {
                    let mut req = self.http.request(method.clone(), &url);
                    if let Some(json) = &body {
                        req = req.json(json);
                    }
                    req
                },
                cancel,
            )
            .await?;

        match cancel {
            Some(c) => tokio::select! {
                () = c.cancelled() => Err(AskdeskError::Cancelled.into()),
                r = Self::handle_response(response) => r,
            },
            None => Self::handle_response(response).await,
        }
    }

    fn parse<T: DeserializeOwned>(body: Option<String>) -> Result<T> {
        let text = body.ok_or_else(|| {
            AskdeskError::Api {
                message: "Expected a response body, got 204 No Content".to_string(),
                status: 204,
                request_id: None,
            }
        })?;
        Ok(serde_json::from_str(&text).map_err(AskdeskError::Serialization)?)
    }

    /// `GET` a JSON resource.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        Self::parse(self.request(Method::GET, path, None, None).await?)
    }

    /// `POST` a JSON body and parse the JSON response.
    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let json = serde_json::to_value(body).map_err(AskdeskError::Serialization)?;
        Self::parse(self.request(Method::POST, path, Some(json), None).await?)
    }

    /// `POST` a JSON body with a cancellation handle threaded into the call.
    ///
    /// Cancelling the token aborts the underlying request and resolves this
    /// future with [`AskdeskError::Cancelled`]; no retry is attempted.
    pub async fn post_cancellable<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let json = serde_json::to_value(body).map_err(AskdeskError::Serialization)?;
        Self::parse(
            self.request(Method::POST, path, Some(json), Some(cancel))
                .await?,
        )
    }

    /// `POST` a JSON body to an endpoint that acknowledges with 204.
    pub async fn post_no_content<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let json = serde_json::to_value(body).map_err(AskdeskError::Serialization)?;
        self.request(Method::POST, path, Some(json), None).await?;
        Ok(())
    }

    /// `PUT` a JSON body and parse the JSON response.
    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let json = serde_json::to_value(body).map_err(AskdeskError::Serialization)?;
        Self::parse(self.request(Method::PUT, path, Some(json), None).await?)
    }

    /// `PATCH` a JSON body and parse the JSON response.
    pub async fn patch<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let json = serde_json::to_value(body).map_err(AskdeskError::Serialization)?;
        Self::parse(self.request(Method::PATCH, path, Some(json), None).await?)
    }

    /// `DELETE` a resource; the backend acknowledges with 204.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.request(Method::DELETE, path, None, None).await?;
        Ok(())
    }

    /// Upload a file as `multipart/form-data` and parse the JSON response.
    ///
    /// The form is rebuilt from the owned bytes on the retry attempt, since
    /// multipart bodies are not reusable.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        field: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<T> {
        let url = self.url(path);
        let field = field.to_string();
        let file_name = file_name.to_string();
        let response = self
            .send_with_retry(
                || {
                    let part = reqwest::multipart::Part::bytes(bytes.clone())
                        .file_name(file_name.clone());
                    let form = reqwest::multipart::Form::new().part(field.clone(), part);
                    self.http.post(&url).multipart(form)
                },
                None,
            )
            .await?;
        Self::parse(Self::handle_response(response).await?)
    }
}

/// Pull the backend's `detail` message out of an error body.
///
/// Falls back to the raw text when the body is non-empty but not the
/// expected JSON shape.
fn extract_detail(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = value.get("detail").and_then(|d| d.as_str()) {
            return Some(detail.to_string());
        }
    }
    Some(body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_detail_from_json_body() {
        assert_eq!(
            extract_detail(r#"{"detail": "Session not found"}"#).as_deref(),
            Some("Session not found")
        );
    }

    #[test]
    fn test_extract_detail_falls_back_to_raw_text() {
        assert_eq!(extract_detail("upstream exploded").as_deref(), Some("upstream exploded"));
    }

    #[test]
    fn test_extract_detail_empty_body_is_none() {
        assert!(extract_detail("").is_none());
        assert!(extract_detail("   ").is_none());
    }

    #[test]
    fn test_extract_detail_json_without_detail_keeps_raw() {
        assert_eq!(
            extract_detail(r#"{"error": "x"}"#).as_deref(),
            Some(r#"{"error": "x"}"#)
        );
    }
}
