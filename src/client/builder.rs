use crate::client::blocking::BlockingClient;
use crate::client::core::AsyncClient;
use crate::client::policy::{JitterSource, RetryPolicy};
use crate::config::{ClientConfig, PartialConfig, PartialSecurity};
use crate::transport::{BlockingHttpTransport, HttpTransport};
use crate::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Builder for clients with layered configuration.
///
/// Explicit settings here win over `DEEPEXEC_*` environment variables, which
/// win over the optional config file, which wins over the defaults.
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    config_file: Option<PathBuf>,
    overrides: PartialConfig,
    skip_env: bool,
    jitter: Option<JitterSource>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON or YAML config file as the lowest explicit layer.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Ignore the process environment (useful in tests).
    pub fn without_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.overrides.endpoint = Some(endpoint.into());
        self
    }

    pub fn deepseek_key(mut self, key: impl Into<String>) -> Self {
        self.overrides.deepseek_key = Some(key.into());
        self
    }

    pub fn e2b_key(mut self, key: impl Into<String>) -> Self {
        self.overrides.e2b_key = Some(key.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.overrides.timeout = Some(timeout.as_secs_f64());
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.overrides.max_retries = Some(n);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.overrides.retry_delay = Some(delay.as_secs_f64());
        self
    }

    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.overrides.verify_ssl = Some(verify);
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.overrides.user_id = Some(user_id.into());
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.overrides.poll_interval = Some(interval.as_secs_f64());
        self
    }

    pub fn max_code_length(mut self, max: usize) -> Self {
        self.security().max_code_length = Some(max);
        self
    }

    pub fn allowed_languages(mut self, languages: Vec<String>) -> Self {
        self.security().allowed_languages = Some(languages);
        self
    }

    pub fn blocked_keywords(mut self, keywords: Vec<String>) -> Self {
        self.security().blocked_keywords = Some(keywords);
        self
    }

    /// Pin the backoff jitter (defaults to the clock).
    pub fn jitter(mut self, jitter: JitterSource) -> Self {
        self.jitter = Some(jitter);
        self
    }

    fn security(&mut self) -> &mut PartialSecurity {
        self.overrides.security.get_or_insert_with(PartialSecurity::default)
    }

    /// Resolve the layered configuration without opening a client.
    pub fn resolve(&self) -> Result<ClientConfig> {
        if self.skip_env {
            let mut layered = PartialConfig::default();
            if let Some(path) = &self.config_file {
                layered = layered.merge(PartialConfig::from_file(path)?);
            }
            let config = layered
                .merge(self.overrides.clone())
                .apply(ClientConfig::default())?;
            config.validate()?;
            return Ok(config);
        }
        ClientConfig::resolve(self.config_file.as_deref(), self.overrides.clone())
    }

    fn retry_policy(&self, config: &ClientConfig) -> RetryPolicy {
        let policy = RetryPolicy::from_config(config);
        match self.jitter {
            Some(j) => policy.with_jitter(j),
            None => policy,
        }
    }

    /// Build the non-blocking client.
    pub fn build(self) -> Result<AsyncClient<HttpTransport>> {
        let config = self.resolve()?;
        let retry = self.retry_policy(&config);
        let transport = HttpTransport::new(&config)?;
        Ok(AsyncClient::with_transport(config, transport).with_retry_policy(retry))
    }

    /// Build the blocking client. Must not be called from inside an async runtime.
    pub fn build_blocking(self) -> Result<BlockingClient<BlockingHttpTransport>> {
        let config = self.resolve()?;
        let retry = self.retry_policy(&config);
        let transport = BlockingHttpTransport::new(&config)?;
        Ok(BlockingClient::with_transport(config, transport).with_retry_policy(retry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_settings_win() {
        let config = ClientBuilder::new()
            .without_env()
            .endpoint("http://localhost:8080/v1")
            .max_retries(0)
            .timeout(Duration::from_secs(5))
            .max_code_length(42)
            .resolve()
            .unwrap();
        assert_eq!(config.endpoint, "http://localhost:8080/v1");
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.security.max_code_length, 42);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn invalid_endpoint_fails_to_resolve() {
        let err = ClientBuilder::new()
            .without_env()
            .endpoint("::::")
            .resolve()
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }
}
