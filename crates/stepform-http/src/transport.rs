//! The transport seam.
//!
//! Forms never perform I/O themselves. Every call to a widget-definition or
//! validation endpoint goes through a [`Transport`], which hosts implement on
//! top of whatever HTTP stack they run (a browser `fetch` binding, a native
//! client, a scripted mock in tests).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use stepform_core::{FieldValue, FormData, Settings, StepformError};

pub use http::Method;

/// A failed transport call.
///
/// `body` holds the decoded error payload when the server sent one; its
/// `error` field is preferred over the generic status text when building a
/// user-facing message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{status} {status_text}")]
pub struct TransportError {
    /// The HTTP status code, or 0 for network failures.
    pub status: u16,
    /// The generic status text (e.g. "Not Found").
    pub status_text: String,
    /// The structured error body, if any.
    pub body: Option<Value>,
}

impl TransportError {
    /// A failure with an HTTP status and status text.
    pub fn http(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: None,
        }
    }

    /// A failure that never produced an HTTP response.
    pub fn network(status_text: impl Into<String>) -> Self {
        Self::http(0, status_text)
    }

    /// Attaches a structured error body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns the server-provided `error` text if present, else the status text.
    pub fn message(&self) -> String {
        self.body
            .as_ref()
            .and_then(|b| b.get("error"))
            .and_then(Value::as_str)
            .map_or_else(|| self.status_text.clone(), ToString::to_string)
    }
}

impl From<TransportError> for StepformError {
    fn from(err: TransportError) -> Self {
        Self::Transport {
            status: err.status,
            message: err.message(),
        }
    }
}

/// Performs requests against server endpoints.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `payload` to `endpoint` and returns the decoded JSON response.
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        payload: &FormData,
    ) -> Result<Value, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        payload: &FormData,
    ) -> Result<Value, TransportError> {
        (**self).request(method, endpoint, payload).await
    }
}

/// Builds the URL of an HTTP API endpoint: `<prefix>/<version>/<endpoint>`.
///
/// # Examples
///
/// ```
/// use stepform_core::Settings;
/// use stepform_http::api_url;
///
/// let settings = Settings::default();
/// assert_eq!(api_url(&settings, "form/widgets/signup", None), "/api/1/form/widgets/signup");
/// assert_eq!(api_url(&settings, "/ping", Some("2")), "/api/2/ping");
/// ```
pub fn api_url(settings: &Settings, endpoint: &str, version: Option<&str>) -> String {
    format!(
        "{}/{}/{}",
        settings.api_prefix.trim_end_matches('/'),
        version.unwrap_or(&settings.api_version),
        endpoint.trim_start_matches('/')
    )
}

/// A transport decorator that maps endpoints to API URLs and attaches the
/// ambient request context (user agent, language).
pub struct ApiTransport<T> {
    inner: T,
    settings: Settings,
}

impl<T: Transport> ApiTransport<T> {
    /// Wraps `inner` using the API layout from `settings`.
    pub const fn new(inner: T, settings: Settings) -> Self {
        Self { inner, settings }
    }
}

#[async_trait]
impl<T: Transport> Transport for ApiTransport<T> {
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        payload: &FormData,
    ) -> Result<Value, TransportError> {
        let url = api_url(&self.settings, endpoint, None);
        let mut data = payload.clone();

        if self.settings.include_user_agent {
            if let Some(ua) = &self.settings.user_agent {
                data.insert("__user_agent".to_string(), FieldValue::Text(ua.clone()));
            }
        }
        data.insert(
            "__lang".to_string(),
            FieldValue::Text(self.settings.language_code.clone()),
        );

        tracing::debug!(%method, %url, "api request");
        self.inner.request(method, &url, &data).await
    }
}
