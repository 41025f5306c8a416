//! Error classification logic.
//!
//! Transport outcomes map onto the error taxonomy through one table,
//! [`CLASSIFICATION_TABLE`]. Retry verdicts follow from the resulting
//! [`ErrorKind`], so the retry engine never inspects status codes itself.

use crate::error::{Details, ErrorKind};
use crate::Error;
use serde_json::Value;
use std::time::Duration;

/// Observable outcome of one request, before it becomes an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// HTTP 401 or 403.
    Unauthorized,
    /// HTTP 429.
    RateLimited,
    /// HTTP 5xx.
    ServerError,
    TransportTimeout,
    TransportFailure,
    /// Any other non-2xx status.
    UnexpectedStatus,
    MalformedEnvelope,
    JobFailed,
}

/// Condition → error kind. Retryability is [`ErrorKind::is_retryable`].
pub const CLASSIFICATION_TABLE: &[(Condition, ErrorKind)] = &[
    (Condition::Unauthorized, ErrorKind::Auth),
    // Rate limits surface as auth errors and are not retried by the engine.
    (Condition::RateLimited, ErrorKind::Auth),
    (Condition::ServerError, ErrorKind::Connection),
    (Condition::TransportTimeout, ErrorKind::Timeout),
    (Condition::TransportFailure, ErrorKind::Connection),
    (Condition::UnexpectedStatus, ErrorKind::Protocol),
    (Condition::MalformedEnvelope, ErrorKind::Protocol),
    (Condition::JobFailed, ErrorKind::Execution),
];

pub fn kind_for(condition: Condition) -> ErrorKind {
    CLASSIFICATION_TABLE
        .iter()
        .find(|(c, _)| *c == condition)
        .map(|(_, k)| *k)
        .unwrap_or(ErrorKind::Protocol)
}

/// `None` for 2xx.
pub fn condition_for_status(status: u16) -> Option<Condition> {
    match status {
        200..=299 => None,
        401 | 403 => Some(Condition::Unauthorized),
        429 => Some(Condition::RateLimited),
        500..=599 => Some(Condition::ServerError),
        _ => Some(Condition::UnexpectedStatus),
    }
}

/// Build the error for a non-2xx HTTP response.
///
/// The message is the body's `error.message` when present, else the raw body.
pub fn classify_status(status: u16, body: &str) -> Error {
    let condition = condition_for_status(status).unwrap_or(Condition::UnexpectedStatus);
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error_block = parsed.as_ref().and_then(|v| v.get("error"));
    let detail = error_block
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {}", status)
            } else {
                trimmed.to_string()
            }
        });

    let message = match condition {
        Condition::Unauthorized => format!("Authentication failed: {}", detail),
        Condition::RateLimited => format!("Rate limit exceeded: {}", detail),
        Condition::ServerError => format!("Server error: {}", detail),
        _ => format!("Request failed with status {}: {}", status, detail),
    };

    let mut details = Details::new();
    details.insert("status_code".into(), Value::from(status));
    if let Some(code) = error_block.and_then(|e| e.get("code")).and_then(Value::as_str) {
        details.insert("error_code".into(), Value::from(code));
    }
    build(kind_for(condition), message, details)
}

/// Fold a reqwest failure into the taxonomy.
pub fn classify_reqwest(err: &reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        return build(
            kind_for(Condition::TransportTimeout),
            format!("Request timed out after {:.1}s", timeout.as_secs_f64()),
            Details::new(),
        );
    }
    if let Some(status) = err.status() {
        return classify_status(status.as_u16(), &err.to_string());
    }
    build(
        kind_for(Condition::TransportFailure),
        format!("Connection error: {}", err),
        Details::new(),
    )
}

/// Error for a 2xx body that is not a usable envelope.
pub fn malformed(message: impl Into<String>) -> Error {
    build(kind_for(Condition::MalformedEnvelope), message, Details::new())
}

fn build(kind: ErrorKind, message: impl Into<String>, details: Details) -> Error {
    let message = message.into();
    match kind {
        ErrorKind::Auth => Error::Auth { message, details },
        ErrorKind::Connection => Error::Connection { message, details },
        ErrorKind::Timeout => Error::Timeout { message, details },
        ErrorKind::Execution => Error::Execution {
            message,
            exit_code: None,
            output: None,
            details,
        },
        ErrorKind::Configuration => Error::Configuration { message, details },
        ErrorKind::Validation => Error::Validation {
            message,
            field: None,
            details,
        },
        ErrorKind::Protocol => Error::Protocol {
            message,
            code: None,
            details,
        },
    }
}
