//! MCP wire error codes.
//!
//! Error envelopes carry a `code` string. This module maps those strings to a
//! closed enum so callers can branch on them without string matching.
//!
//! | Code | Category | Typical cause |
//! |------|----------|---------------|
//! | `invalid_request` | client | malformed input or missing fields |
//! | `authentication_error` | client | rejected API keys |
//! | `rate_limit_exceeded` | rate | too many requests |
//! | `execution_error` | job | sandbox reported a failure |
//! | `generation_error` | job | model reported a failure |
//! | `timeout_error` | server | server-side deadline exceeded |
//! | `server_error` | server | internal failure |
//! | `unknown_error` | unknown | anything else |
//!
//! ## Example
//!
//! ```rust
//! use deepexec_mcp::error_code::McpErrorCode;
//!
//! let code = McpErrorCode::from_wire("rate_limit_exceeded");
//! assert_eq!(code, McpErrorCode::RateLimitExceeded);
//! assert_eq!(code.category(), "rate");
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum McpErrorCode {
    InvalidRequest,
    AuthenticationError,
    RateLimitExceeded,
    ExecutionError,
    GenerationError,
    TimeoutError,
    ServerError,
    UnknownError,
}

impl McpErrorCode {
    /// The string used on the wire (e.g. `"invalid_request"`).
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::AuthenticationError => "authentication_error",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::ExecutionError => "execution_error",
            Self::GenerationError => "generation_error",
            Self::TimeoutError => "timeout_error",
            Self::ServerError => "server_error",
            Self::UnknownError => "unknown_error",
        }
    }

    /// Returns the category: `"client"`, `"rate"`, `"job"`, `"server"` or `"unknown"`.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidRequest | Self::AuthenticationError => "client",
            Self::RateLimitExceeded => "rate",
            Self::ExecutionError | Self::GenerationError => "job",
            Self::TimeoutError | Self::ServerError => "server",
            Self::UnknownError => "unknown",
        }
    }

    /// Maps a wire code to the enum. Unrecognized codes become `UnknownError`.
    pub fn from_wire(code: &str) -> Self {
        match code {
            "invalid_request" => Self::InvalidRequest,
            "authentication_error" => Self::AuthenticationError,
            "rate_limit_exceeded" => Self::RateLimitExceeded,
            "execution_error" => Self::ExecutionError,
            "generation_error" => Self::GenerationError,
            "timeout_error" => Self::TimeoutError,
            "server_error" => Self::ServerError,
            _ => Self::UnknownError,
        }
    }
}

impl fmt::Display for McpErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
