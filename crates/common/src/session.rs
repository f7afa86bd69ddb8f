// Session identifiers: validation and extraction from session URLs.

use serde::{Deserialize, Serialize};
use std::fmt;
use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::Url;

/// Maximum session identifier length in UTF-8 bytes. Snapshot file names are
/// `<id>.json.tmp`, which must stay under the usual 255-byte name limit.
pub const MAX_SESSION_ID_BYTES: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionIdError {
    #[error("session id is empty")]
    Empty,

    #[error("session id exceeds maximum length of {MAX_SESSION_ID_BYTES} bytes")]
    TooLong,

    #[error("session id contains invalid character: {0:?}")]
    InvalidChar(char),

    #[error("session id is a reserved path component: {0}")]
    Reserved(String),

    #[error("invalid session url: {0}")]
    InvalidUrl(String),
}

/// Opaque identifier of a chat session, safe to use as a storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Validate a raw session identifier.
    ///
    /// Rules:
    /// - Reject empty ids and ids over 128 bytes
    /// - Reject `/`, `\`, null and other control characters
    /// - Reject `.` and `..`
    pub fn parse(input: &str) -> Result<Self, SessionIdError> {
        if input.is_empty() {
            return Err(SessionIdError::Empty);
        }
        if input.len() > MAX_SESSION_ID_BYTES {
            return Err(SessionIdError::TooLong);
        }
        if let Some(bad) = input.chars().find(|c| matches!(c, '/' | '\\') || c.is_control()) {
            return Err(SessionIdError::InvalidChar(bad));
        }
        if input == "." || input == ".." {
            return Err(SessionIdError::Reserved(input.to_string()));
        }
        Ok(Self(input.to_string()))
    }

    /// Extract the session id from a session URL such as
    /// `https://coiisy.app/chat/<id>`: the last non-empty path segment,
    /// percent-decoded so it matches the id typed directly.
    pub fn from_url(input: &str) -> Result<Self, SessionIdError> {
        let url = Url::parse(input).map_err(|e| SessionIdError::InvalidUrl(e.to_string()))?;
        let segment = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
            .ok_or_else(|| SessionIdError::InvalidUrl(format!("no path segment in `{input}`")))?;
        let decoded = percent_decode_str(segment)
            .decode_utf8()
            .map_err(|e| SessionIdError::InvalidUrl(format!("session segment is not UTF-8: {e}")))?;
        Self::parse(&decoded)
    }

    /// Accept either a session URL or a bare identifier.
    pub fn from_user_input(input: &str) -> Result<Self, SessionIdError> {
        let trimmed = input.trim();
        if trimmed.contains("://") {
            Self::from_url(trimmed)
        } else {
            Self::parse(trimmed)
        }
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

impl TryFrom<String> for SessionId {
    type Error = SessionIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionId> for String {
    fn from(value: SessionId) -> Self {
        value.0
    }
}
