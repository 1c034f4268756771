//! Opaque continuation cursor for paged listing.
//!
//! The cursor names the last row the previous page returned: its creation
//! timestamp plus its id as tie-breaker, so the keyset stays total even
//! when two entries share a timestamp. It is a versioned record so that
//! malformed or cross-version tokens are rejected deterministically
//! instead of surfacing as a decode panic somewhere below.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Current cursor encoding version.
pub const CURSOR_VERSION: u8 = 1;

/// Resume point for the next page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    #[serde(rename = "v")]
    version: u8,

    /// `created_at` of the last row on the previous page.
    #[serde(rename = "ts")]
    pub created_at: DateTime<Utc>,

    /// Id of that row; orders rows with identical timestamps.
    pub id: Uuid,
}

/// Cursor decoding failures. All of them are caller input errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("malformed continuation token")]
    Malformed,

    #[error("unsupported continuation token version {0}")]
    Version(u8),
}

impl PageCursor {
    pub fn new(created_at: DateTime<Utc>, id: Uuid) -> Self {
        Self {
            version: CURSOR_VERSION,
            created_at,
            id,
        }
    }

    /// Encode as an opaque URL-safe token.
    pub fn encode(&self) -> String {
        // Serializing a struct of three scalars cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decode a token handed back by a client.
    pub fn decode(token: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| CursorError::Malformed)?;
        let cursor: PageCursor =
            serde_json::from_slice(&bytes).map_err(|_| CursorError::Malformed)?;

        if cursor.version != CURSOR_VERSION {
            return Err(CursorError::Version(cursor.version));
        }

        Ok(cursor)
    }
}
