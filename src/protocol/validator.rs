//! Protocol version and session id checks.

use super::SUPPORTED_VERSIONS;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static SESSION_ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

const MIN_SESSION_ID_LEN: usize = 8;

/// Fails unless `version` is one of [`SUPPORTED_VERSIONS`].
pub fn validate_protocol_version(version: Option<&str>) -> Result<()> {
    match version {
        Some(v) if SUPPORTED_VERSIONS.contains(&v) => Ok(()),
        Some(v) => Err(Error::protocol(format!("Unsupported protocol version: {}", v))
            .with_detail("protocol_version", v)),
        None => Err(Error::protocol("Unsupported protocol version: <missing>")),
    }
}

/// Session ids are at least 8 characters of `[A-Za-z0-9_-]`.
pub fn validate_session_id(session_id: &str) -> Result<()> {
    if session_id.len() < MIN_SESSION_ID_LEN {
        return Err(Error::protocol(format!(
            "Invalid session id: must be at least {} characters",
            MIN_SESSION_ID_LEN
        )));
    }
    if !SESSION_ID_PATTERN.is_match(session_id) {
        return Err(Error::protocol(
            "Invalid session id: only alphanumerics, '_' and '-' are allowed",
        ));
    }
    Ok(())
}

/// A session id that passed [`validate_session_id`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        validate_session_id(&raw)?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
