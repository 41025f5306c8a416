//! 客户端配置：默认值、配置文件、环境变量与显式参数的分层合并。
//!
//! Client configuration.
//!
//! Values are layered with explicit precedence:
//! builder arguments > environment > config file > defaults.
//! Each layer is a [`PartialConfig`]; [`ClientConfig::resolve`] folds them
//! over [`ClientConfig::default`] and validates the result.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.deepexec.com/v1";
pub const DEFAULT_USER_ID: &str = "default";

/// Environment variable prefix shared by every setting.
pub const ENV_PREFIX: &str = "DEEPEXEC_";

/// Client-side limits applied to code before it is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityOptions {
    pub max_code_length: usize,
    /// Empty means every supported language is allowed.
    pub allowed_languages: Vec<String>,
    pub blocked_keywords: Vec<String>,
}

impl Default for SecurityOptions {
    fn default() -> Self {
        Self {
            max_code_length: 10_000,
            allowed_languages: Vec::new(),
            blocked_keywords: Vec::new(),
        }
    }
}

impl SecurityOptions {
    pub fn check_language(&self, language: &str) -> Result<()> {
        if self.allowed_languages.is_empty()
            || self
                .allowed_languages
                .iter()
                .any(|l| l.eq_ignore_ascii_case(language))
        {
            return Ok(());
        }
        Err(Error::validation(
            "language",
            format!("Language '{}' is not allowed by security options", language),
        ))
    }

    pub fn check_code(&self, code: &str) -> Result<()> {
        if code.chars().count() > self.max_code_length {
            return Err(Error::validation(
                "code",
                format!(
                    "Code exceeds maximum length of {} characters",
                    self.max_code_length
                ),
            ));
        }
        let lowered = code.to_lowercase();
        if let Some(keyword) = self
            .blocked_keywords
            .iter()
            .find(|k| !k.is_empty() && lowered.contains(&k.to_lowercase()))
        {
            return Err(Error::validation(
                "code",
                format!("Code contains blocked keyword: {}", keyword),
            ));
        }
        Ok(())
    }
}

/// Resolved, immutable client configuration.
#[derive(Clone, PartialEq)]
pub struct ClientConfig {
    pub endpoint: String,
    pub deepseek_key: Option<String>,
    pub e2b_key: Option<String>,
    /// Default per-request transport timeout.
    pub timeout: Duration,
    pub max_retries: u32,
    /// Base delay of the exponential backoff.
    pub retry_delay: Duration,
    pub verify_ssl: bool,
    /// Used when a session is created lazily.
    pub user_id: String,
    /// Interval between job status reads in composite waits.
    pub poll_interval: Duration,
    pub security: SecurityOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            deepseek_key: None,
            e2b_key: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            verify_ssl: true,
            user_id: DEFAULT_USER_ID.to_string(),
            poll_interval: Duration::from_millis(500),
            security: SecurityOptions::default(),
        }
    }
}

// Keys stay out of logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |k: &Option<String>| k.as_ref().map(|_| "***");
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("deepseek_key", &redact(&self.deepseek_key))
            .field("e2b_key", &redact(&self.e2b_key))
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("verify_ssl", &self.verify_ssl)
            .field("user_id", &self.user_id)
            .field("poll_interval", &self.poll_interval)
            .field("security", &self.security)
            .finish()
    }
}

impl ClientConfig {
    /// Defaults overlaid with `DEEPEXEC_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::resolve(None, PartialConfig::default())
    }

    /// Fold file, environment and explicit overrides over the defaults.
    pub fn resolve(file: Option<&Path>, overrides: PartialConfig) -> Result<Self> {
        let mut layered = PartialConfig::default();
        if let Some(path) = file {
            layered = layered.merge(PartialConfig::from_file(path)?);
        }
        layered = layered
            .merge(PartialConfig::from_env()?)
            .merge(overrides);
        let config = layered.apply(Self::default())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.endpoint).map_err(|e| {
            Error::configuration(format!("Invalid endpoint URL '{}': {}", self.endpoint, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::configuration(format!(
                "Endpoint must use http or https: {}",
                self.endpoint
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::configuration("poll_interval must be positive"));
        }
        Ok(())
    }

    /// Both credentials are required to open a session.
    pub fn has_credentials(&self) -> bool {
        let present = |k: &Option<String>| k.as_deref().map(|v| !v.is_empty()).unwrap_or(false);
        present(&self.deepseek_key) && present(&self.e2b_key)
    }
}

/// One configuration layer. Every field is optional; `None` defers to the layer below.
///
/// Deserializes from JSON or YAML with snake_case or camelCase keys.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PartialConfig {
    pub endpoint: Option<String>,
    #[serde(alias = "deepseekKey")]
    pub deepseek_key: Option<String>,
    #[serde(alias = "e2bKey")]
    pub e2b_key: Option<String>,
    /// Seconds.
    pub timeout: Option<f64>,
    #[serde(alias = "maxRetries")]
    pub max_retries: Option<u32>,
    /// Seconds.
    #[serde(alias = "retryDelay")]
    pub retry_delay: Option<f64>,
    #[serde(alias = "verifySSL", alias = "verifySsl")]
    pub verify_ssl: Option<bool>,
    #[serde(alias = "userId")]
    pub user_id: Option<String>,
    /// Seconds.
    #[serde(alias = "pollInterval")]
    pub poll_interval: Option<f64>,
    #[serde(alias = "securityOptions", alias = "security_options")]
    pub security: Option<PartialSecurity>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PartialSecurity {
    #[serde(alias = "maxCodeLength")]
    pub max_code_length: Option<usize>,
    #[serde(alias = "allowedLanguages")]
    pub allowed_languages: Option<Vec<String>>,
    #[serde(alias = "blockedKeywords")]
    pub blocked_keywords: Option<Vec<String>>,
}

impl PartialSecurity {
    fn merge(self, over: PartialSecurity) -> Self {
        Self {
            max_code_length: over.max_code_length.or(self.max_code_length),
            allowed_languages: over.allowed_languages.or(self.allowed_languages),
            blocked_keywords: over.blocked_keywords.or(self.blocked_keywords),
        }
    }

    fn is_empty(&self) -> bool {
        self == &PartialSecurity::default()
    }
}

impl PartialConfig {
    /// Load a JSON (`.json`) or YAML (`.yaml`/`.yml`) file. A missing file is an empty layer.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, skipping");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(Error::configuration(format!(
                    "Failed to read config file {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Self::from_json(&text),
            Some("yaml") | Some("yml") => Self::from_yaml(&text),
            _ => Err(Error::configuration(format!(
                "Unsupported config file format: {}",
                path.display()
            ))),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::configuration(format!("Invalid JSON config: {}", e)))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
            .map_err(|e| Error::configuration(format!("Invalid YAML config: {}", e)))
    }

    /// Read `DEEPEXEC_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read `DEEPEXEC_*` variables through `lookup` (keys include the prefix).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|v| !v.trim().is_empty())
        };

        let security = PartialSecurity {
            max_code_length: parse_var(&get, "MAX_CODE_LENGTH")?,
            allowed_languages: get("ALLOWED_LANGUAGES").map(|v| split_list(&v)),
            blocked_keywords: get("BLOCKED_KEYWORDS").map(|v| split_list(&v)),
        };

        Ok(Self {
            endpoint: get("ENDPOINT"),
            deepseek_key: get("DEEPSEEK_KEY"),
            e2b_key: get("E2B_KEY"),
            timeout: parse_var(&get, "TIMEOUT")?,
            max_retries: parse_var(&get, "MAX_RETRIES")?,
            retry_delay: parse_var(&get, "RETRY_DELAY")?,
            verify_ssl: get("VERIFY_SSL").map(|v| v.trim().eq_ignore_ascii_case("true")),
            user_id: get("USER_ID"),
            poll_interval: None,
            security: (!security.is_empty()).then_some(security),
        })
    }

    /// Overlay `over` on `self`; fields set in `over` win. Security options merge per field.
    pub fn merge(self, over: PartialConfig) -> Self {
        let security = match (self.security, over.security) {
            (Some(base), Some(top)) => Some(base.merge(top)),
            (base, top) => top.or(base),
        };
        Self {
            endpoint: over.endpoint.or(self.endpoint),
            deepseek_key: over.deepseek_key.or(self.deepseek_key),
            e2b_key: over.e2b_key.or(self.e2b_key),
            timeout: over.timeout.or(self.timeout),
            max_retries: over.max_retries.or(self.max_retries),
            retry_delay: over.retry_delay.or(self.retry_delay),
            verify_ssl: over.verify_ssl.or(self.verify_ssl),
            user_id: over.user_id.or(self.user_id),
            poll_interval: over.poll_interval.or(self.poll_interval),
            security,
        }
    }

    /// Write the set fields onto `base`.
    pub fn apply(self, mut base: ClientConfig) -> Result<ClientConfig> {
        if let Some(v) = self.endpoint {
            base.endpoint = v;
        }
        if let Some(v) = self.deepseek_key {
            base.deepseek_key = Some(v);
        }
        if let Some(v) = self.e2b_key {
            base.e2b_key = Some(v);
        }
        if let Some(v) = self.timeout {
            base.timeout = seconds("timeout", v)?;
        }
        if let Some(v) = self.max_retries {
            base.max_retries = v;
        }
        if let Some(v) = self.retry_delay {
            base.retry_delay = seconds("retry_delay", v)?;
        }
        if let Some(v) = self.verify_ssl {
            base.verify_ssl = v;
        }
        if let Some(v) = self.user_id {
            base.user_id = v;
        }
        if let Some(v) = self.poll_interval {
            base.poll_interval = seconds("poll_interval", v)?;
        }
        if let Some(sec) = self.security {
            if let Some(v) = sec.max_code_length {
                base.security.max_code_length = v;
            }
            if let Some(v) = sec.allowed_languages {
                base.security.allowed_languages = v;
            }
            if let Some(v) = sec.blocked_keywords {
                base.security.blocked_keywords = v;
            }
        }
        Ok(base)
    }
}

fn parse_var<T, G>(get: &G, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            Error::configuration(format!("Invalid value for {}{}: {}", ENV_PREFIX, name, e))
                .with_detail("variable", format!("{}{}", ENV_PREFIX, name))
        }),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn seconds(field: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        Error::configuration(format!(
            "{} must be a non-negative number of seconds, got {}",
            field, secs
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let c = ClientConfig::default();
        assert_eq!(c.endpoint, "https://api.deepexec.com/v1");
        assert_eq!(c.timeout, Duration::from_secs(30));
        assert_eq!(c.max_retries, 3);
        assert_eq!(c.retry_delay, Duration::from_secs(1));
        assert!(c.verify_ssl);
        assert!(!c.has_credentials());
        assert_eq!(c.security.max_code_length, 10_000);
        c.validate().unwrap();
    }

    #[test]
    fn env_layer_parses_values() {
        let layer = PartialConfig::from_lookup(lookup(&[
            ("DEEPEXEC_ENDPOINT", "http://localhost:9000"),
            ("DEEPEXEC_TIMEOUT", "12.5"),
            ("DEEPEXEC_MAX_RETRIES", "5"),
            ("DEEPEXEC_VERIFY_SSL", "FALSE"),
            ("DEEPEXEC_DEEPSEEK_KEY", "ds"),
            ("DEEPEXEC_E2B_KEY", "e2b"),
            ("DEEPEXEC_ALLOWED_LANGUAGES", "python, bash ,"),
        ]))
        .unwrap();
        let c = layer.apply(ClientConfig::default()).unwrap();
        assert_eq!(c.endpoint, "http://localhost:9000");
        assert_eq!(c.timeout, Duration::from_millis(12_500));
        assert_eq!(c.max_retries, 5);
        assert!(!c.verify_ssl);
        assert!(c.has_credentials());
        assert_eq!(c.security.allowed_languages, vec!["python", "bash"]);
        assert_eq!(c.security.max_code_length, 10_000);
    }

    #[test]
    fn bad_env_number_is_configuration_error() {
        let err = PartialConfig::from_lookup(lookup(&[("DEEPEXEC_MAX_RETRIES", "many")]))
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
        assert_eq!(err.details()["variable"], "DEEPEXEC_MAX_RETRIES");
    }

    #[test]
    fn camel_case_file_keys() {
        let layer = PartialConfig::from_json(
            r#"{"maxRetries": 7, "retryDelay": 0.25, "verifySSL": false,
                "securityOptions": {"maxCodeLength": 50, "blockedKeywords": ["rm -rf"]}}"#,
        )
        .unwrap();
        let c = layer.apply(ClientConfig::default()).unwrap();
        assert_eq!(c.max_retries, 7);
        assert_eq!(c.retry_delay, Duration::from_millis(250));
        assert!(!c.verify_ssl);
        assert_eq!(c.security.max_code_length, 50);
        assert_eq!(c.security.blocked_keywords, vec!["rm -rf"]);
    }

    #[test]
    fn yaml_layer() {
        let layer = PartialConfig::from_yaml(
            "endpoint: https://example.test/v1\nmax_retries: 1\nsecurity:\n  allowed_languages: [python]\n",
        )
        .unwrap();
        assert_eq!(layer.max_retries, Some(1));
        assert_eq!(
            layer.security.unwrap().allowed_languages,
            Some(vec!["python".to_string()])
        );
        assert_eq!(PartialConfig::from_yaml("").unwrap(), PartialConfig::default());
    }

    #[test]
    fn precedence_and_nested_merge() {
        let file = PartialConfig::from_json(
            r#"{"timeout": 10, "max_retries": 1, "security": {"max_code_length": 100, "allowed_languages": ["go"]}}"#,
        )
        .unwrap();
        let env = PartialConfig::from_lookup(lookup(&[
            ("DEEPEXEC_TIMEOUT", "20"),
            ("DEEPEXEC_MAX_CODE_LENGTH", "200"),
        ]))
        .unwrap();
        let args = PartialConfig {
            timeout: Some(40.0),
            ..PartialConfig::default()
        };
        let c = file
            .merge(env)
            .merge(args)
            .apply(ClientConfig::default())
            .unwrap();
        assert_eq!(c.timeout, Duration::from_secs(40));
        assert_eq!(c.max_retries, 1);
        assert_eq!(c.security.max_code_length, 200);
        assert_eq!(c.security.allowed_languages, vec!["go"]);
    }

    #[test]
    fn missing_file_is_empty_layer() {
        let layer = PartialConfig::from_file(Path::new("/nonexistent/deepexec.json")).unwrap();
        assert_eq!(layer, PartialConfig::default());
    }

    #[test]
    fn endpoint_must_be_a_url() {
        let c = ClientConfig {
            endpoint: "not a url".into(),
            ..ClientConfig::default()
        };
        assert_eq!(c.validate().unwrap_err().kind(), crate::ErrorKind::Configuration);
        let c = ClientConfig {
            endpoint: "ftp://example.test".into(),
            ..ClientConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn negative_seconds_rejected() {
        let layer = PartialConfig {
            retry_delay: Some(-1.0),
            ..PartialConfig::default()
        };
        assert!(layer.apply(ClientConfig::default()).is_err());
    }

    #[test]
    fn debug_redacts_keys() {
        let c = ClientConfig {
            deepseek_key: Some("secret-ds".into()),
            ..ClientConfig::default()
        };
        let s = format!("{:?}", c);
        assert!(!s.contains("secret-ds"));
        assert!(s.contains("***"));
    }
}
