//! 传输层：单次 HTTP 请求能力（异步与阻塞两种实现）。
//!
//! Transport capabilities.
//!
//! The client engine only needs "perform one request". [`Transport`] is the
//! non-blocking capability, [`BlockingTransport`] the blocking one. Both
//! report transport failures (connect, timeout) as already-classified
//! [`crate::Error`]s and hand back every HTTP response, including non-2xx,
//! as a [`WireResponse`] for the engine to interpret.

pub mod blocking;
pub mod http;

pub use blocking::BlockingHttpTransport;
pub use http::HttpTransport;

use crate::config::ClientConfig;
use crate::{BoxStream, Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;

pub const DEEPSEEK_KEY_HEADER: &str = "x-deepseek-key";
pub const E2B_KEY_HEADER: &str = "x-e2b-key";

/// One outgoing POST.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Path relative to the configured endpoint, e.g. `/jobs/abc/status`.
    pub path: String,
    pub body: Value,
    pub timeout: Duration,
    /// Operation name for logs.
    pub operation: &'static str,
}

impl Call {
    pub fn new(operation: &'static str, path: impl Into<String>, body: Value, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            body,
            timeout,
            operation,
        }
    }
}

/// Raw HTTP response: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    pub status: u16,
    pub body: String,
}

impl WireResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Non-blocking "perform one request" capability.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, call: &Call) -> Result<WireResponse>;

    /// Open a server-sent-events response and return its raw body bytes.
    ///
    /// Non-2xx statuses are returned as classified errors instead of a stream.
    async fn open_stream(&self, call: &Call) -> Result<BoxStream<'static, Bytes>>;
}

/// Blocking "perform one request" capability.
pub trait BlockingTransport: Send + Sync {
    fn post(&self, call: &Call) -> Result<WireResponse>;
}

/// Join the configured endpoint and a call path.
pub(crate) fn join_url(endpoint: &str, path: &str) -> Result<url::Url> {
    let joined = format!(
        "{}/{}",
        endpoint.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url::Url::parse(&joined)
        .map_err(|e| Error::configuration(format!("Invalid request URL '{}': {}", joined, e)))
}

/// Headers sent with every request. Credentials are attached when configured.
pub(crate) fn default_headers(config: &ClientConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    for (name, key) in [
        (DEEPSEEK_KEY_HEADER, &config.deepseek_key),
        (E2B_KEY_HEADER, &config.e2b_key),
    ] {
        if let Some(key) = key.as_deref().filter(|k| !k.is_empty()) {
            let mut value = HeaderValue::from_str(key).map_err(|_| {
                Error::configuration(format!("API key for header {} is not a valid header value", name))
            })?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static(name), value);
        }
    }
    Ok(headers)
}
