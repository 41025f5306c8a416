//! Session manager: credential gate and handshake interpretation.
//!
//! The facades hold the session in a write-once cell; this module only decides
//! whether a handshake may be attempted and what its response means.

use crate::config::ClientConfig;
use crate::protocol::{NormalizedResponse, SessionId};
use crate::transport::WireResponse;
use crate::{Error, Result};
use serde_json::Value;

use super::execution::decode_envelope;

/// Both keys must be present before a handshake is sent.
pub(crate) fn require_credentials(config: &ClientConfig) -> Result<()> {
    if config.has_credentials() {
        return Ok(());
    }
    let missing: Vec<Value> = [
        ("deepseek_key", &config.deepseek_key),
        ("e2b_key", &config.e2b_key),
    ]
    .into_iter()
    .filter(|(_, k)| k.as_deref().map(str::is_empty).unwrap_or(true))
    .map(|(name, _)| Value::from(name))
    .collect();
    Err(
        Error::auth("Both DeepSeek and E2B API keys are required to create a session")
            .with_detail("missing", missing),
    )
}

pub(crate) fn decode_session(response: WireResponse) -> Result<SessionId> {
    match decode_envelope(response)? {
        NormalizedResponse::SessionCreated { session_id } if session_id.is_empty() => {
            Err(Error::protocol("Session creation response did not contain a session_id"))
        }
        NormalizedResponse::SessionCreated { session_id } => SessionId::parse(session_id),
        other => Err(Error::protocol(format!(
            "Unexpected response to session creation: {:?}",
            other.response_type()
        ))),
    }
}

pub(crate) fn already_active(session: &SessionId) -> Error {
    Error::protocol("A session is already active for this client")
        .with_detail("session_id", session.as_str())
}

pub(crate) fn no_session() -> Error {
    Error::protocol("No active session. Call create_session() first.")
}

pub(crate) fn closed() -> Error {
    Error::protocol("Client has been closed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn missing_either_key_is_auth_error() {
        let config = ClientConfig {
            deepseek_key: Some("ds".into()),
            e2b_key: None,
            ..ClientConfig::default()
        };
        let err = require_credentials(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert_eq!(err.details()["missing"], serde_json::json!(["e2b_key"]));

        let config = ClientConfig {
            deepseek_key: Some(String::new()),
            e2b_key: Some("e".into()),
            ..ClientConfig::default()
        };
        assert!(require_credentials(&config).is_err());
    }

    #[test]
    fn session_response_validation() {
        let ok = decode_session(WireResponse::new(
            200,
            r#"{"protocol_version": "2024.1", "type": "session_created", "status": "success", "session_id": "sess_12345678"}"#,
        ))
        .unwrap();
        assert_eq!(ok.as_str(), "sess_12345678");

        let err = decode_session(WireResponse::new(
            200,
            r#"{"protocol_version": "2024.1", "type": "session_created", "status": "success"}"#,
        ))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let err = decode_session(WireResponse::new(
            200,
            r#"{"protocol_version": "2024.1", "type": "session_created", "status": "success", "session_id": "bad id!"}"#,
        ))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }
}
