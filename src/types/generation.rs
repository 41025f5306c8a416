//! Text generation request and result types.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "deepseek-v3";

/// A prompt to complete remotely.
#[derive(Debug, Clone)]
pub struct TextGenerationRequest {
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Per-call budget: transport timeout for direct generation, max wait for job generation.
    pub timeout: Duration,
}

impl TextGenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn temperature(mut self, temp: f64) -> Self {
        self.temperature = temp;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(Error::validation("prompt", "Prompt cannot be empty"));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(Error::validation(
                "temperature",
                "Temperature must be between 0.0 and 1.0",
            ));
        }
        if self.max_tokens == 0 {
            return Err(Error::validation("max_tokens", "max_tokens must be positive"));
        }
        Ok(())
    }

    /// `input` block of a `text_generation` envelope.
    pub(crate) fn envelope_input(&self) -> Map<String, Value> {
        let mut input = Map::new();
        input.insert("prompt".into(), Value::from(self.prompt.clone()));
        input.insert("max_tokens".into(), Value::from(self.max_tokens));
        input.insert("temperature".into(), Value::from(self.temperature));
        input
    }

    /// `metadata` block of a `text_generation` envelope.
    pub(crate) fn envelope_metadata(&self) -> Map<String, Value> {
        let mut meta = Map::new();
        meta.insert("model".into(), Value::from(self.model.clone()));
        meta
    }

    /// `data` block of a `text_generation` job.
    pub(crate) fn job_data(&self) -> Map<String, Value> {
        let mut data = self.envelope_input();
        data.insert("model".into(), Value::from(self.model.clone()));
        data
    }
}

/// Token accounting reported by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub(crate) fn from_snake_case(usage: Option<&Value>) -> Self {
        let count = |key: &str| {
            usage
                .and_then(|u| u.get(key))
                .and_then(Value::as_u64)
                .unwrap_or(0)
        };
        Self {
            prompt_tokens: count("prompt_tokens"),
            completion_tokens: count("completion_tokens"),
            total_tokens: count("total_tokens"),
        }
    }
}

/// Normalized result of a text generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub text: String,
    pub model: String,
    /// Milliseconds.
    #[serde(rename = "generationTime")]
    pub generation_time_ms: u64,
    pub usage: TokenUsage,
}

impl GenerationResult {
    /// `text` comes from `text_source`, everything else from `meta_source`.
    pub(crate) fn from_snake_case(text_source: &Value, meta_source: &Value) -> Self {
        Self {
            text: text_source
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            model: meta_source
                .get("model")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            generation_time_ms: meta_source
                .get("generation_time")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            usage: TokenUsage::from_snake_case(meta_source.get("usage")),
        }
    }

    /// Result payload of a completed `text_generation` job (flat shape).
    pub fn from_job_result(result: &Value) -> Self {
        Self::from_snake_case(result, result)
    }
}

/// One chunk of a streamed generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validation_rules() {
        assert!(TextGenerationRequest::new("hi").validate().is_ok());
        assert!(TextGenerationRequest::new(" ").validate().is_err());
        assert!(TextGenerationRequest::new("hi").temperature(1.5).validate().is_err());
        assert!(TextGenerationRequest::new("hi").temperature(-0.1).validate().is_err());
        assert!(TextGenerationRequest::new("hi").max_tokens(0).validate().is_err());
    }

    #[test]
    fn envelope_blocks_split_model_into_metadata() {
        let req = TextGenerationRequest::new("hi").model("m1").max_tokens(5);
        assert!(req.envelope_input().get("model").is_none());
        assert_eq!(req.envelope_metadata()["model"], "m1");
        assert_eq!(req.job_data()["model"], "m1");
        assert_eq!(req.job_data()["max_tokens"], 5);
    }

    #[test]
    fn job_result_reads_flat_shape() {
        let r = GenerationResult::from_job_result(&json!({
            "text": "hello",
            "model": "deepseek-v3",
            "generation_time": 40,
            "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
        }));
        assert_eq!(r.text, "hello");
        assert_eq!(r.usage.total_tokens, 5);
        assert_eq!(r.generation_time_ms, 40);
    }

    #[test]
    fn missing_model_is_unknown() {
        let r = GenerationResult::from_job_result(&json!({"text": "x"}));
        assert_eq!(r.model, "unknown");
        assert_eq!(r.usage, TokenUsage::default());
    }

    #[test]
    fn chunk_defaults() {
        let c: StreamChunk = serde_json::from_str(r#"{"text":"a"}"#).unwrap();
        assert!(!c.done);
        let c: StreamChunk = serde_json::from_str(r#"{"done":true}"#).unwrap();
        assert_eq!(c.text, "");
    }
}
