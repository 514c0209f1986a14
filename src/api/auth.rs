//! Bearer token authentication.
//!
//! Users are managed elsewhere; a request is authenticated by an HMAC signed JWT
//! whose `sub` claim is the numeric user id.

use super::error::{ApiError, ErrorCode};
use super::AppState;
use crate::{Error, UserId};
use axum::extract::{Request, State};
use axum::http::{header::AUTHORIZATION, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub iss: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub iat: i64,
}

/// The user a request was authenticated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

/// JWT validator and issuer
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtValidator {
    pub fn new(secret: &[u8], issuer: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.to_string(),
        }
    }

    pub fn issue(&self, user_id: UserId, ttl: Duration) -> Result<String, Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iss: self.issuer.clone(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| Error::Other(format!("could not sign token: {}", e)))
    }

    pub fn validate(&self, token: &str) -> Result<UserId, Error> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    Error::Unauthorized("token expired".to_string())
                }
                _ => Error::Unauthorized(e.to_string()),
            }
        })?;

        token_data
            .claims
            .sub
            .parse()
            .map_err(|_| Error::Unauthorized("invalid user id".to_string()))
    }
}

/// Reject requests without a valid bearer token, otherwise attach [`AuthUser`].
pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_owned())
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::UNAUTHORIZED,
                ErrorCode::AuthRequired,
                "missing bearer token",
            )
        })?;
    let user_id = state.jwt.validate(&token)?;
    request.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(request).await)
}
