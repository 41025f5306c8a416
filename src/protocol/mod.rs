//! 协议层：MCP 信封的构建、解析与校验。
//!
//! # Protocol Layer
//!
//! Every request and response exchanged with the service is wrapped in a
//! versioned JSON envelope. This module owns that wire format.
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`envelope`] | Request envelope construction, request/response type tags |
//! | [`codec`] | Response parsing and normalization into typed results |
//! | [`validator`] | Protocol version and session id checks |
//!
//! ## Example
//!
//! ```rust
//! use deepexec_mcp::protocol::{build_request, parse_response, NormalizedResponse, RequestType};
//! use serde_json::{json, Map};
//!
//! let envelope = build_request(RequestType::CreateSession, None, Map::new(), Map::new());
//! let wire = serde_json::to_value(&envelope).unwrap();
//! assert!(wire.get("session_id").is_none());
//!
//! let parsed = parse_response(json!({
//!     "protocol_version": "2024.1",
//!     "type": "session_created",
//!     "status": "success",
//!     "session_id": "sess_12345678"
//! }))
//! .unwrap();
//! assert!(matches!(parsed, NormalizedResponse::SessionCreated { .. }));
//! ```

pub mod codec;
pub mod envelope;
pub mod validator;

pub use codec::{parse_response, NormalizedResponse};
pub use envelope::{
    build_request, ensure_request_id, JobQuery, RequestEnvelope, RequestType, ResponseStatus,
    ResponseType,
};
pub use validator::{validate_protocol_version, validate_session_id, SessionId};

/// Protocol version stamped on every outgoing envelope.
pub const PROTOCOL_VERSION: &str = "2024.1";

/// Versions accepted on incoming envelopes.
pub const SUPPORTED_VERSIONS: &[&str] = &[PROTOCOL_VERSION];
