use super::{default_headers, join_url, Call, Transport, WireResponse};
use crate::client::error_classification::{classify_reqwest, classify_status};
use crate::config::ClientConfig;
use crate::{BoxStream, Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::header::{HeaderValue, ACCEPT};
use std::time::Duration;

/// Async HTTP transport backed by a pooled `reqwest::Client`.
///
/// There is no client-wide total timeout: every [`Call`] carries its own,
/// and streams are only bounded by the connect timeout.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .default_headers(default_headers(config)?)
            .connect_timeout(config.timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| Error::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, call: &Call) -> Result<WireResponse> {
        let url = join_url(&self.endpoint, &call.path)?;
        tracing::trace!(operation = call.operation, path = %call.path, "sending request");

        let response = self
            .client
            .post(url)
            .timeout(call.timeout)
            .json(&call.body)
            .send()
            .await
            .map_err(|e| classify_reqwest(&e, call.timeout))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest(&e, call.timeout))?;
        Ok(WireResponse { status, body })
    }

    async fn open_stream(&self, call: &Call) -> Result<BoxStream<'static, Bytes>> {
        let url = join_url(&self.endpoint, &call.path)?;
        tracing::trace!(operation = call.operation, path = %call.path, "opening stream");

        let response = self
            .client
            .post(url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .json(&call.body)
            .send()
            .await
            .map_err(|e| classify_reqwest(&e, call.timeout))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let timeout = call.timeout;
        let bytes = response
            .bytes_stream()
            .map_err(move |e| classify_reqwest(&e, timeout));
        Ok(Box::pin(bytes))
    }
}
