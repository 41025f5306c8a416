//! Endpoint paths and request construction for every protocol operation.

use crate::protocol::{build_request, JobQuery, RequestType, SessionId};
use crate::transport::Call;
use crate::types::{CodeExecutionRequest, JobType, SubmitJobRequest, TextGenerationRequest};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::time::Duration;

/// Service endpoints, relative to the configured base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    Sessions,
    Execute,
    Generate,
    GenerateStream,
    Cancel,
    Jobs,
    JobStatus(&'a str),
    JobCancel(&'a str),
}

impl Endpoint<'_> {
    pub fn path(&self) -> String {
        match self {
            Endpoint::Sessions => "/sessions".to_string(),
            Endpoint::Execute => "/execute".to_string(),
            Endpoint::Generate => "/generate".to_string(),
            Endpoint::GenerateStream => "/generate/stream".to_string(),
            Endpoint::Cancel => "/cancel".to_string(),
            Endpoint::Jobs => "/jobs".to_string(),
            Endpoint::JobStatus(id) => format!("/jobs/{}/status", id),
            Endpoint::JobCancel(id) => format!("/jobs/{}/cancel", id),
        }
    }

    /// Operation name used in logs and fallback errors.
    pub fn operation(&self) -> &'static str {
        match self {
            Endpoint::Sessions => "create_session",
            Endpoint::Execute => "execute_code",
            Endpoint::Generate => "generate_text",
            Endpoint::GenerateStream => "stream_generate_text",
            Endpoint::Cancel => "cancel_execution",
            Endpoint::Jobs => "submit_job",
            Endpoint::JobStatus(_) => "get_job_status",
            Endpoint::JobCancel(_) => "cancel_job",
        }
    }
}

/// Job ids are interpolated into paths, so they must be a single non-empty segment.
pub(crate) fn check_job_id(job_id: &str) -> Result<()> {
    if job_id.trim().is_empty() {
        return Err(Error::validation("job_id", "Job ID cannot be empty"));
    }
    if job_id.contains(['/', '?', '#']) {
        return Err(Error::validation(
            "job_id",
            format!("Job ID contains reserved characters: {}", job_id),
        ));
    }
    Ok(())
}

fn call(endpoint: Endpoint<'_>, body: Value, timeout: Duration) -> Call {
    Call::new(endpoint.operation(), endpoint.path(), body, timeout)
}

pub(crate) fn create_session(user_id: &str, timeout: Duration) -> Call {
    let mut input = Map::new();
    input.insert("user_id".into(), Value::from(user_id));
    let envelope = build_request(RequestType::CreateSession, None, input, Map::new());
    call(Endpoint::Sessions, envelope.to_value(), timeout)
}

pub(crate) fn execute(session: &SessionId, request: &CodeExecutionRequest) -> Call {
    let envelope = build_request(
        RequestType::CodeExecution,
        Some(session.as_str()),
        request.envelope_input(),
        Map::new(),
    );
    call(Endpoint::Execute, envelope.to_value(), request.timeout)
}

pub(crate) fn generate(session: &SessionId, request: &TextGenerationRequest) -> Call {
    let envelope = build_request(
        RequestType::TextGeneration,
        Some(session.as_str()),
        request.envelope_input(),
        request.envelope_metadata(),
    );
    call(Endpoint::Generate, envelope.to_value(), request.timeout)
}

pub(crate) fn generate_stream(session: &SessionId, request: &TextGenerationRequest) -> Call {
    let envelope = build_request(
        RequestType::TextGenerationStream,
        Some(session.as_str()),
        request.envelope_input(),
        request.envelope_metadata(),
    );
    call(Endpoint::GenerateStream, envelope.to_value(), request.timeout)
}

pub(crate) fn cancel_execution(session: &SessionId, timeout: Duration) -> Call {
    let envelope = build_request(
        RequestType::CancelExecution,
        Some(session.as_str()),
        Map::new(),
        Map::new(),
    );
    call(Endpoint::Cancel, envelope.to_value(), timeout)
}

pub(crate) fn submit_job(
    session: &SessionId,
    job_type: JobType,
    request: &SubmitJobRequest,
    timeout: Duration,
) -> Call {
    let envelope = build_request(
        job_type.into(),
        Some(session.as_str()),
        request.data.clone(),
        request.metadata(),
    );
    call(Endpoint::Jobs, envelope.to_value(), timeout)
}

pub(crate) fn job_status(session: &SessionId, job_id: &str, timeout: Duration) -> Call {
    let body = JobQuery::new(Some(session.as_str()), job_id).to_value();
    call(Endpoint::JobStatus(job_id), body, timeout)
}

pub(crate) fn job_cancel(
    session: &SessionId,
    job_id: &str,
    reason: Option<&str>,
    timeout: Duration,
) -> Call {
    let body = JobQuery::new(Some(session.as_str()), job_id)
        .with_reason(reason)
        .to_value();
    call(Endpoint::JobCancel(job_id), body, timeout)
}
