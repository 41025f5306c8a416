//! Code execution request and result types.

use crate::config::SecurityOptions;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Languages the execution sandbox accepts.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "python",
    "javascript",
    "typescript",
    "java",
    "c",
    "cpp",
    "csharp",
    "go",
    "rust",
    "ruby",
    "php",
    "bash",
    "powershell",
];

const DEFAULT_WORKING_DIRECTORY: &str = "/home/user";

/// A piece of code to run remotely.
#[derive(Debug, Clone)]
pub struct CodeExecutionRequest {
    pub code: String,
    pub language: String,
    pub environment: BTreeMap<String, String>,
    pub working_directory: String,
    /// Per-call budget: transport timeout for direct execution, max wait for job execution.
    pub timeout: Duration,
}

impl CodeExecutionRequest {
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
            environment: BTreeMap::new(),
            working_directory: DEFAULT_WORKING_DIRECTORY.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = dir.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn normalized_language(&self) -> String {
        self.language.trim().to_lowercase()
    }

    /// Shape and security checks; runs before any network call.
    pub fn validate(&self, security: &SecurityOptions) -> Result<()> {
        if self.code.trim().is_empty() {
            return Err(Error::validation("code", "Code cannot be empty"));
        }
        let language = self.normalized_language();
        if !SUPPORTED_LANGUAGES.contains(&language.as_str()) {
            return Err(Error::validation(
                "language",
                format!(
                    "Unsupported language: {}. Supported languages: {}",
                    self.language,
                    SUPPORTED_LANGUAGES.join(", ")
                ),
            ));
        }
        security.check_language(&language)?;
        security.check_code(&self.code)
    }

    /// `input` block of a `code_execution` envelope.
    pub(crate) fn envelope_input(&self) -> Map<String, Value> {
        let mut input = Map::new();
        input.insert("code".into(), Value::from(self.code.clone()));
        input.insert("language".into(), Value::from(self.normalized_language()));
        input.insert(
            "environment".into(),
            serde_json::to_value(&self.environment).unwrap_or_default(),
        );
        input.insert(
            "working_directory".into(),
            Value::from(self.working_directory.clone()),
        );
        input
    }

    /// `data` block of a `code_execution` job.
    pub(crate) fn job_data(&self) -> Map<String, Value> {
        let mut data = self.envelope_input();
        data.insert("timeout".into(), Value::from(self.timeout.as_secs()));
        data
    }
}

/// Normalized result of a code execution.
///
/// Serializes with the client-facing camelCase field names
/// (`exitCode`, `executionTime`, `memoryUsage`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub output: String,
    pub exit_code: i32,
    /// Milliseconds.
    #[serde(rename = "executionTime")]
    pub execution_time_ms: u64,
    /// Megabytes.
    #[serde(rename = "memoryUsage")]
    pub memory_usage_mb: u64,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ExecutionResult {
    /// Read the server's snake_case fields. Missing exit codes count as failure (1).
    pub(crate) fn from_snake_case(fields: &Value, metadata: Map<String, Value>) -> Self {
        Self {
            output: fields
                .get("output")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            exit_code: fields
                .get("exit_code")
                .and_then(Value::as_i64)
                .and_then(|c| i32::try_from(c).ok())
                .unwrap_or(1),
            execution_time_ms: fields
                .get("execution_time")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            memory_usage_mb: fields
                .get("memory_usage")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            metadata,
        }
    }

    /// Result payload of a completed `code_execution` job.
    pub fn from_job_result(result: &Value) -> Self {
        let metadata = result
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Self::from_snake_case(result, metadata)
    }

    #[inline]
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}
