//! Time limited public sharing links.

use crate::{document::Document, Error};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::Serialize;

/// Default lifetime of an issued link.
pub const DEFAULT_LINK_TTL_HOURS: i64 = 24;

const TOKEN_BYTES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicLink {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl PublicLink {
    /// A fresh random link valid for `ttl` from `now`.
    pub fn issue(now: DateTime<Utc>, ttl: Duration) -> Result<Self, Error> {
        if ttl <= Duration::zero() {
            return Err(Error::Validation(
                "public link lifetime must be positive".to_owned(),
            ));
        }
        Ok(PublicLink {
            token: generate_token(),
            expires_at: now + ttl,
        })
    }
}

/// URL safe token from 16 random bytes, 22 characters long.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::encode_config(bytes, base64::URL_SAFE_NO_PAD)
}

/// Check that `document` may be served through its public link at `now`.
/// Expired links stay attached to the document and only fail here.
pub fn check_access(document: &Document, now: DateTime<Utc>) -> Result<(), Error> {
    if !document.is_public || document.public_token.is_none() {
        return Err(Error::InvalidLink);
    }
    match document.public_expires_at {
        Some(expires_at) if now > expires_at => Err(Error::Expired),
        _ => Ok(()),
    }
}
