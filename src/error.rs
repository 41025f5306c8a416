use crate::error_code::McpErrorCode;
use serde_json::{Map, Value};
use thiserror::Error;

/// Structured, machine-readable detail map attached to every error.
pub type Details = Map<String, Value>;

/// Closed classification of [`Error`] values.
///
/// The retry engine only ever looks at the kind, never at messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credentials missing/rejected, or rate limit hit.
    Auth,
    /// Network failure or server-side (5xx) failure.
    Connection,
    /// Transport timeout or job-wait timeout.
    Timeout,
    /// Malformed envelope, version mismatch, invalid session, remote error envelope.
    Protocol,
    /// The remote job reported failure.
    Execution,
    /// Invalid configuration (file, environment, endpoint).
    Configuration,
    /// Request rejected client-side before any network call.
    Validation,
}

impl ErrorKind {
    /// Whether the retry engine may attempt the request again.
    #[inline]
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Connection | ErrorKind::Timeout)
    }

    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Auth => "auth",
            ErrorKind::Connection => "connection",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Execution => "execution",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Validation => "validation",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Unified error type for the MCP client.
///
/// Low-level transport failures are folded into these categories by
/// [`crate::client::error_classification`] before they reach callers.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Authentication error: {message}")]
    Auth { message: String, details: Details },

    #[error("Connection error: {message}")]
    Connection { message: String, details: Details },

    #[error("Timeout: {message}")]
    Timeout { message: String, details: Details },

    #[error("Protocol error{}: {message}", format_code(.code))]
    Protocol {
        message: String,
        /// Remote error code, present when the error came from an error envelope.
        code: Option<String>,
        details: Details,
    },

    #[error("Execution error: {message}")]
    Execution {
        message: String,
        exit_code: Option<i32>,
        output: Option<String>,
        details: Details,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String, details: Details },

    #[error("Validation error: {message}{}", format_field(.field))]
    Validation {
        message: String,
        field: Option<String>,
        details: Details,
    },
}

fn format_code(code: &Option<String>) -> String {
    code.as_ref().map(|c| format!(" ({})", c)).unwrap_or_default()
}

fn format_field(field: &Option<String>) -> String {
    field
        .as_ref()
        .map(|f| format!(" (field: {})", f))
        .unwrap_or_default()
}

impl Error {
    pub fn auth(msg: impl Into<String>) -> Self {
        Error::Auth {
            message: msg.into(),
            details: Details::new(),
        }
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Error::Connection {
            message: msg.into(),
            details: Details::new(),
        }
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Error::Timeout {
            message: msg.into(),
            details: Details::new(),
        }
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol {
            message: msg.into(),
            code: None,
            details: Details::new(),
        }
    }

    /// Protocol error reported by the server through an error envelope.
    pub fn remote(code: impl Into<String>, msg: impl Into<String>, details: Details) -> Self {
        Error::Protocol {
            message: msg.into(),
            code: Some(code.into()),
            details,
        }
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Error::Execution {
            message: msg.into(),
            exit_code: None,
            output: None,
            details: Details::new(),
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration {
            message: msg.into(),
            details: Details::new(),
        }
    }

    pub fn validation(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Validation {
            message: msg.into(),
            field: Some(field.into()),
            details: Details::new(),
        }
    }

    /// Attach one structured detail entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details_mut().insert(key.into(), value.into());
        self
    }

    /// Attach exit code and output context to an execution error. No-op for other kinds.
    pub fn with_execution_context(mut self, code: Option<i32>, out: Option<String>) -> Self {
        if let Error::Execution {
            exit_code, output, ..
        } = &mut self
        {
            *exit_code = code;
            *output = out;
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Auth { .. } => ErrorKind::Auth,
            Error::Connection { .. } => ErrorKind::Connection,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Protocol { .. } => ErrorKind::Protocol,
            Error::Execution { .. } => ErrorKind::Execution,
            Error::Configuration { .. } => ErrorKind::Configuration,
            Error::Validation { .. } => ErrorKind::Validation,
        }
    }

    #[inline]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Human-readable message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Error::Auth { message, .. }
            | Error::Connection { message, .. }
            | Error::Timeout { message, .. }
            | Error::Protocol { message, .. }
            | Error::Execution { message, .. }
            | Error::Configuration { message, .. }
            | Error::Validation { message, .. } => message,
        }
    }

    pub fn details(&self) -> &Details {
        match self {
            Error::Auth { details, .. }
            | Error::Connection { details, .. }
            | Error::Timeout { details, .. }
            | Error::Protocol { details, .. }
            | Error::Execution { details, .. }
            | Error::Configuration { details, .. }
            | Error::Validation { details, .. } => details,
        }
    }

    fn details_mut(&mut self) -> &mut Details {
        match self {
            Error::Auth { details, .. }
            | Error::Connection { details, .. }
            | Error::Timeout { details, .. }
            | Error::Protocol { details, .. }
            | Error::Execution { details, .. }
            | Error::Configuration { details, .. }
            | Error::Validation { details, .. } => details,
        }
    }

    /// Wire error code for protocol errors that came from an error envelope.
    pub fn error_code(&self) -> Option<McpErrorCode> {
        match self {
            Error::Protocol {
                code: Some(code), ..
            } => Some(McpErrorCode::from_wire(code)),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::protocol(format!("invalid JSON payload: {}", e))
    }
}
