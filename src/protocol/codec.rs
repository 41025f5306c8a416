//! Response envelope parsing.
//!
//! Responses are checked for a supported protocol version, then for an error
//! envelope, then normalized by `type`. Unknown types are handed back as-is.

use super::envelope::{ResponseStatus, ResponseType};
use super::validator::validate_protocol_version;
use crate::error::Details;
use crate::types::{ExecutionResult, GenerationResult};
use crate::{Error, Result};
use serde_json::Value;

/// A parsed success envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResponse {
    /// `session_id` is whatever the server sent; an empty string means it was missing.
    SessionCreated { session_id: String },
    CodeExecution(ExecutionResult),
    TextGeneration(GenerationResult),
    ExecutionCanceled { session_id: Option<String> },
    /// Unrecognized response type, passed through unmodified.
    Other(Value),
}

impl NormalizedResponse {
    /// Wire tag of the normalized variant (`None` for passthrough).
    pub fn response_type(&self) -> Option<ResponseType> {
        match self {
            NormalizedResponse::SessionCreated { .. } => Some(ResponseType::SessionCreated),
            NormalizedResponse::CodeExecution(_) => Some(ResponseType::CodeExecutionResult),
            NormalizedResponse::TextGeneration(_) => Some(ResponseType::TextGenerationResult),
            NormalizedResponse::ExecutionCanceled { .. } => Some(ResponseType::ExecutionCanceled),
            NormalizedResponse::Other(_) => None,
        }
    }
}

/// Parse a response envelope into a [`NormalizedResponse`].
///
/// # Errors
///
/// - [`Error::Protocol`] without a code when the protocol version is missing or unsupported
/// - [`Error::Protocol`] carrying the remote `code`, `message` and `details` for error envelopes
pub fn parse_response(raw: Value) -> Result<NormalizedResponse> {
    check_envelope(&raw)?;

    let tag = raw.get("type").and_then(Value::as_str).unwrap_or_default();
    let Some(response_type) = ResponseType::from_wire(tag) else {
        return Ok(NormalizedResponse::Other(raw));
    };

    Ok(match response_type {
        ResponseType::SessionCreated => session_created(&raw),
        ResponseType::CodeExecutionResult => code_execution(&raw),
        ResponseType::TextGenerationResult => text_generation(&raw),
        ResponseType::ExecutionCanceled => execution_canceled(&raw),
    })
}

/// Version and error-envelope checks for typed responses.
pub(crate) fn check_envelope(raw: &Value) -> Result<()> {
    validate_protocol_version(raw.get("protocol_version").and_then(Value::as_str))?;
    if is_error_envelope(raw) {
        return Err(remote_error(raw));
    }
    Ok(())
}

/// Checks for job snapshots. Their `status` is the job status and their
/// `error` block describes a failed job, so only `status: "error"` marks an
/// error envelope.
pub(crate) fn check_job_envelope(raw: &Value) -> Result<()> {
    validate_protocol_version(raw.get("protocol_version").and_then(Value::as_str))?;
    if raw.get("status").and_then(Value::as_str) == Some("error") {
        return Err(remote_error(raw));
    }
    Ok(())
}

fn is_error_envelope(raw: &Value) -> bool {
    let status_error = raw
        .get("status")
        .and_then(|s| serde_json::from_value::<ResponseStatus>(s.clone()).ok())
        == Some(ResponseStatus::Error);
    status_error || raw.get("error").is_some()
}

/// Build the protocol error described by an error envelope's `error` block.
pub(crate) fn remote_error(raw: &Value) -> Error {
    let error = raw.get("error");
    let field = |key: &str| error.and_then(|e| e.get(key)).and_then(Value::as_str);
    let details: Details = error
        .and_then(|e| e.get("details"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    Error::remote(
        field("code").unwrap_or("unknown_error"),
        field("message").unwrap_or("Unknown error occurred"),
        details,
    )
}

fn session_created(raw: &Value) -> NormalizedResponse {
    NormalizedResponse::SessionCreated {
        session_id: raw
            .get("session_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

fn code_execution(raw: &Value) -> NormalizedResponse {
    let fields = raw
        .get("output")
        .and_then(|o| o.get("execution_result"))
        .cloned()
        .unwrap_or(Value::Null);
    let metadata = raw
        .get("metadata")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    NormalizedResponse::CodeExecution(ExecutionResult::from_snake_case(&fields, metadata))
}

fn text_generation(raw: &Value) -> NormalizedResponse {
    let output = raw.get("output").cloned().unwrap_or(Value::Null);
    let metadata = raw.get("metadata").cloned().unwrap_or(Value::Null);
    NormalizedResponse::TextGeneration(GenerationResult::from_snake_case(&output, &metadata))
}

fn execution_canceled(raw: &Value) -> NormalizedResponse {
    NormalizedResponse::ExecutionCanceled {
        session_id: raw
            .get("session_id")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    #[test]
    fn version_mismatch_is_protocol_error() {
        for v in [json!("2023.9"), json!(""), json!(2024.1), Value::Null] {
            let err = parse_response(json!({
                "protocol_version": v,
                "type": "session_created",
                "status": "success",
                "session_id": "sess_12345678"
            }))
            .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Protocol);
            assert!(err.message().starts_with("Unsupported protocol version"));
        }

        let err = parse_response(json!({"type": "session_created"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn error_envelope_carries_code_message_details() {
        let err = parse_response(json!({
            "protocol_version": "2024.1",
            "status": "error",
            "error": {
                "code": "rate_limit_exceeded",
                "message": "Slow down",
                "details": {"retry_after": 5}
            }
        }))
        .unwrap_err();
        match &err {
            Error::Protocol { code, message, details } => {
                assert_eq!(code.as_deref(), Some("rate_limit_exceeded"));
                assert_eq!(message, "Slow down");
                assert_eq!(details["retry_after"], 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.error_code(),
            Some(crate::error_code::McpErrorCode::RateLimitExceeded)
        );
    }

    #[test]
    fn error_key_without_status_still_fails() {
        let err = parse_response(json!({
            "protocol_version": "2024.1",
            "status": "success",
            "error": {}
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol { ref code, ref message, .. }
                if code.as_deref() == Some("unknown_error") && message == "Unknown error occurred"
        ));
    }

    #[test]
    fn code_execution_result_is_renamed() {
        let parsed = parse_response(json!({
            "protocol_version": "2024.1",
            "type": "code_execution_result",
            "status": "success",
            "session_id": "sess_12345678",
            "output": {"execution_result": {
                "output": "1\n", "exit_code": 0, "execution_time": 31, "memory_usage": 12
            }},
            "metadata": {"language": "python"}
        }))
        .unwrap();
        let NormalizedResponse::CodeExecution(r) = parsed else {
            panic!("expected code execution result");
        };
        assert_eq!(r.output, "1\n");
        assert_eq!(r.exit_code, 0);
        assert_eq!(r.execution_time_ms, 31);
        assert_eq!(r.memory_usage_mb, 12);
        assert_eq!(r.metadata["language"], "python");
    }

    #[test]
    fn text_generation_result_reads_metadata() {
        let parsed = parse_response(json!({
            "protocol_version": "2024.1",
            "type": "text_generation_result",
            "status": "success",
            "output": {"text": "Hello"},
            "metadata": {
                "model": "deepseek-v3",
                "generation_time": 120,
                "usage": {"prompt_tokens": 4, "completion_tokens": 1, "total_tokens": 5}
            }
        }))
        .unwrap();
        let NormalizedResponse::TextGeneration(g) = parsed else {
            panic!("expected text generation result");
        };
        assert_eq!(g.text, "Hello");
        assert_eq!(g.model, "deepseek-v3");
        assert_eq!(g.generation_time_ms, 120);
        assert_eq!(g.usage.total_tokens, 5);
    }

    #[test]
    fn unknown_type_passes_through() {
        let raw = json!({
            "protocol_version": "2024.1",
            "type": "heartbeat",
            "status": "success",
            "output": {"ok": true}
        });
        assert_eq!(
            parse_response(raw.clone()).unwrap(),
            NormalizedResponse::Other(raw)
        );
    }

    #[test]
    fn job_snapshots_keep_their_error_block() {
        let failed = json!({
            "protocol_version": "2024.1",
            "job_id": "j",
            "status": "failed",
            "error": {"message": "boom"}
        });
        assert!(check_job_envelope(&failed).is_ok());
        assert!(check_envelope(&failed).is_err());

        let rejected = json!({
            "protocol_version": "2024.1",
            "status": "error",
            "error": {"code": "invalid_request", "message": "Job already completed"}
        });
        assert_eq!(
            check_job_envelope(&rejected).unwrap_err().message(),
            "Job already completed"
        );
    }

    #[test]
    fn canceled_and_session_variants() {
        let parsed = parse_response(json!({
            "protocol_version": "2024.1",
            "type": "execution_canceled",
            "status": "success",
            "session_id": "sess_12345678"
        }))
        .unwrap();
        assert_eq!(parsed.response_type(), Some(ResponseType::ExecutionCanceled));

        let parsed = parse_response(json!({
            "protocol_version": "2024.1",
            "type": "session_created",
            "status": "success"
        }))
        .unwrap();
        assert_eq!(
            parsed,
            NormalizedResponse::SessionCreated { session_id: String::new() }
        );
    }
}
