use super::{default_headers, join_url, BlockingTransport, Call, WireResponse};
use crate::client::error_classification::classify_reqwest;
use crate::config::ClientConfig;
use crate::{Error, Result};

/// Blocking HTTP transport backed by `reqwest::blocking::Client`.
///
/// Must not be constructed or used from inside an async runtime.
pub struct BlockingHttpTransport {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl BlockingHttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .default_headers(default_headers(config)?)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| Error::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

impl BlockingTransport for BlockingHttpTransport {
    fn post(&self, call: &Call) -> Result<WireResponse> {
        let url = join_url(&self.endpoint, &call.path)?;
        tracing::trace!(operation = call.operation, path = %call.path, "sending request");

        let response = self
            .client
            .post(url)
            .timeout(call.timeout)
            .json(&call.body)
            .send()
            .map_err(|e| classify_reqwest(&e, call.timeout))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| classify_reqwest(&e, call.timeout))?;
        Ok(WireResponse { status, body })
    }
}
