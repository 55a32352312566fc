use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

/// Encode a pagination key as an opaque continuation token.
///
/// The token is URL-safe base64 over the JSON encoding of the key. Callers
/// treat it as a black box: the only contract is that passing it back
/// resumes the listing where the previous page stopped.
pub fn encode_cursor<T: Serialize>(key: &T) -> String {
    // Keys are internal, well-formed structs; a serialization failure here
    // is a bug, not an input condition.
    let bytes = serde_json::to_vec(key).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a continuation token back into its pagination key.
/// Malformed, truncated, or foreign tokens yield [`CursorError`], never a
/// panic.
pub fn decode_cursor<T: DeserializeOwned>(token: &str) -> Result<T, CursorError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token.as_bytes())
        .map_err(|_| CursorError::Invalid)?;
    serde_json::from_slice(&bytes).map_err(|_| CursorError::Invalid)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    Invalid,
}

impl std::fmt::Display for CursorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CursorError::Invalid => write!(f, "invalid continuation token"),
        }
    }
}

impl std::error::Error for CursorError {}

/// Position of the last row of a transactions page: the listing's sort and
/// uniqueness key (`occurred_at DESC, id DESC`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCursor {
    pub occurred_at: DateTime<Utc>,
    pub id: Uuid,
}

impl TransactionCursor {
    pub fn encode(&self) -> String {
        encode_cursor(self)
    }

    pub fn decode(token: &str) -> Result<Self, CursorError> {
        decode_cursor(token)
    }
}
