//! Opaque pagination tokens for the movie listing.
//!
//! A token is URL-safe base64 over a small JSON document carrying the
//! `(createdAt, id)` of the last movie on a page.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Position in the `(created_at DESC, id DESC)` ordering.
///
/// Field order matters: the derived `Ord` compares `created_at` first and
/// `id` second, matching the listing's sort key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieCursor {
    pub created_at: Timestamp,
    pub id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CursorError {
    #[error("token is not valid base64")]
    Encoding(#[from] base64::DecodeError),
    #[error("token payload is malformed")]
    Payload(#[from] serde_json::Error),
    #[error("token carries an empty id")]
    Empty,
}

impl MovieCursor {
    pub fn new(created_at: Timestamp, id: impl Into<String>) -> Self {
        Self { created_at, id: id.into() }
    }

    pub fn encode(&self) -> String {
        // Serializing a timestamp and a string cannot fail.
        let payload = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(payload)
    }

    pub fn decode(token: &str) -> Result<Self, CursorError> {
        let payload = URL_SAFE_NO_PAD.decode(token.trim())?;
        let cursor: MovieCursor = serde_json::from_slice(&payload)?;
        if cursor.id.is_empty() {
            return Err(CursorError::Empty);
        }
        Ok(cursor)
    }
}
