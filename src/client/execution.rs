//! 响应解读：单次尝试的 HTTP 响应到类型化结果。
//!
//! Response interpretation (single attempt).
//!
//! Each decoder turns one [`WireResponse`] into a typed value or a
//! classified error. They run inside the retry loop, so a 5xx status becomes
//! a retryable error here and a malformed body a non-retryable one.

use crate::client::error_classification::{classify_status, malformed};
use crate::protocol::codec::check_job_envelope;
use crate::protocol::{parse_response, NormalizedResponse};
use crate::transport::WireResponse;
use crate::types::{ExecutionResult, GenerationResult, Job};
use crate::Result;
use serde_json::Value;

/// Status check plus JSON decoding.
pub(crate) fn decode_body(response: WireResponse) -> Result<Value> {
    if !response.is_success() {
        return Err(classify_status(response.status, &response.body));
    }
    serde_json::from_str(&response.body).map_err(|e| {
        malformed(format!("Response body is not valid JSON: {}", e))
            .with_detail("status_code", response.status)
    })
}

pub(crate) fn decode_envelope(response: WireResponse) -> Result<NormalizedResponse> {
    parse_response(decode_body(response)?)
}

/// Job responses carry the job fields at the envelope's top level.
pub(crate) fn decode_job(response: WireResponse) -> Result<Job> {
    let body = decode_body(response)?;
    check_job_envelope(&body)?;
    Job::from_wire(&body)
}

pub(crate) fn decode_execution(response: WireResponse) -> Result<ExecutionResult> {
    match decode_envelope(response)? {
        NormalizedResponse::CodeExecution(result) => Ok(result),
        other => Err(unexpected("code_execution_result", &other)),
    }
}

pub(crate) fn decode_generation(response: WireResponse) -> Result<GenerationResult> {
    match decode_envelope(response)? {
        NormalizedResponse::TextGeneration(result) => Ok(result),
        other => Err(unexpected("text_generation_result", &other)),
    }
}

/// Any success envelope acknowledges a cancel request.
pub(crate) fn decode_cancel_ack(response: WireResponse) -> Result<()> {
    decode_envelope(response).map(|_| ())
}

fn unexpected(expected: &str, got: &NormalizedResponse) -> crate::Error {
    let got = match got {
        NormalizedResponse::Other(raw) => raw
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("<none>")
            .to_string(),
        known => known
            .response_type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
    };
    malformed(format!(
        "Unexpected response type: expected {}, got {}",
        expected, got
    ))
}
