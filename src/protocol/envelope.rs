//! Request envelope construction.

use super::PROTOCOL_VERSION;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Request type tag (`type` field of a request envelope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    CreateSession,
    CodeExecution,
    TextGeneration,
    TextGenerationStream,
    CancelExecution,
}

impl RequestType {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestType::CreateSession => "create_session",
            RequestType::CodeExecution => "code_execution",
            RequestType::TextGeneration => "text_generation",
            RequestType::TextGenerationStream => "text_generation_stream",
            RequestType::CancelExecution => "cancel_execution",
        }
    }
}

impl From<crate::types::JobType> for RequestType {
    fn from(t: crate::types::JobType) -> Self {
        match t {
            crate::types::JobType::CodeExecution => RequestType::CodeExecution,
            crate::types::JobType::TextGeneration => RequestType::TextGeneration,
            crate::types::JobType::TextGenerationStream => RequestType::TextGenerationStream,
        }
    }
}

/// Response type tags the codec knows how to normalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseType {
    SessionCreated,
    CodeExecutionResult,
    TextGenerationResult,
    ExecutionCanceled,
}

impl ResponseType {
    /// `None` for tags this client does not know; those pass through untouched.
    pub fn from_wire(tag: &str) -> Option<Self> {
        match tag {
            "session_created" => Some(ResponseType::SessionCreated),
            "code_execution_result" => Some(ResponseType::CodeExecutionResult),
            "text_generation_result" => Some(ResponseType::TextGenerationResult),
            "execution_canceled" => Some(ResponseType::ExecutionCanceled),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResponseType::SessionCreated => "session_created",
            ResponseType::CodeExecutionResult => "code_execution_result",
            ResponseType::TextGenerationResult => "text_generation_result",
            ResponseType::ExecutionCanceled => "execution_canceled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Versioned request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub protocol_version: String,
    #[serde(rename = "type")]
    pub request_type: RequestType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub input: Map<String, Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub request_id: String,
}

impl RequestEnvelope {
    /// Replace the generated request id (e.g. to correlate with an upstream trace).
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    pub fn to_value(&self) -> Value {
        // Every field is a string, enum tag or JSON map.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Build a request envelope stamped with the current protocol version.
///
/// `session_id` is omitted from the wire (not `null`) when absent or empty,
/// which is the case for session creation.
pub fn build_request(
    request_type: RequestType,
    session_id: Option<&str>,
    input: Map<String, Value>,
    metadata: Map<String, Value>,
) -> RequestEnvelope {
    RequestEnvelope {
        protocol_version: PROTOCOL_VERSION.to_string(),
        request_type,
        session_id: session_id.filter(|s| !s.is_empty()).map(str::to_string),
        input,
        metadata,
        request_id: Uuid::new_v4().to_string(),
    }
}

/// Job status/cancel request body (not an envelope type of its own).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobQuery {
    pub protocol_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl JobQuery {
    pub fn new(session_id: Option<&str>, job_id: impl Into<String>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            session_id: session_id.map(str::to_string),
            job_id: job_id.into(),
            reason: None,
            request_id: None,
        }
    }

    pub fn with_reason(mut self, reason: Option<&str>) -> Self {
        self.reason = reason.map(str::to_string);
        self
    }

    pub fn to_value(&self) -> Value {
        let mut v = serde_json::to_value(self).unwrap_or(Value::Null);
        ensure_request_id(&mut v);
        v
    }
}

/// Inject a fresh `request_id` into an outgoing JSON object that lacks one.
pub fn ensure_request_id(body: &mut Value) {
    if let Value::Object(map) = body {
        let missing = map
            .get("request_id")
            .map(|v| v.is_null() || v.as_str().map(str::is_empty).unwrap_or(false))
            .unwrap_or(true);
        if missing {
            map.insert(
                "request_id".into(),
                Value::from(Uuid::new_v4().to_string()),
            );
        }
    }
}
