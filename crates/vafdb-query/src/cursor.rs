//! Opaque pagination cursors.
//!
//! A cursor names a position in the `(created, id)` order, the direction to
//! continue in, and the fingerprint of the query that minted it. On the wire
//! it is URL-safe base64 (no padding) over a compact JSON token, so clients
//! can pass it through query strings untouched.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ordering::{Dir, SeekKey};

const TOKEN_VERSION: u8 = 2;

/// An encoded cursor as sent to and received from clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    /// Wraps a client-supplied string. Nothing is checked until decoding.
    pub fn new(encoded: impl Into<String>) -> Self {
        Cursor(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Mints a cursor continuing from `key` in `dir` for the query with
    /// `fingerprint`.
    pub fn encode(key: SeekKey, dir: Dir, fingerprint: &str) -> Result<Cursor> {
        let token = Token {
            v: TOKEN_VERSION,
            c: key.created.timestamp(),
            n: key.created.timestamp_subsec_nanos(),
            i: key.id,
            d: dir,
            f: fingerprint.to_string(),
        };
        let json = serde_json::to_vec(&token).map_err(Error::store)?;
        Ok(Cursor(URL_SAFE_NO_PAD.encode(json)))
    }

    /// Decodes the cursor, checking it belongs to the query with
    /// `fingerprint`.
    pub fn decode(&self, fingerprint: &str) -> Result<Position> {
        let position = self.decode_token(fingerprint);
        if position.is_none() {
            tracing::warn!(cursor = %self.0, "rejected pagination cursor");
        }
        position.ok_or(Error::BadCursor)
    }

    fn decode_token(&self, fingerprint: &str) -> Option<Position> {
        let bytes = URL_SAFE_NO_PAD.decode(self.0.as_bytes()).ok()?;
        let token: Token = serde_json::from_slice(&bytes).ok()?;
        if token.v != TOKEN_VERSION || token.f != fingerprint {
            return None;
        }
        let created = DateTime::<Utc>::from_timestamp(token.c, token.n)?;
        Some(Position {
            key: SeekKey::new(created, token.i),
            dir: token.d,
        })
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A decoded cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub key: SeekKey,
    pub dir: Dir,
}

#[derive(Serialize, Deserialize)]
struct Token {
    v: u8,
    /// `created` as whole seconds plus nanoseconds, so the key decodes
    /// exactly.
    c: i64,
    n: u32,
    i: u64,
    d: Dir,
    f: String,
}
