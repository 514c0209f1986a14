//! Structured API error responses with error codes.

use crate::Error;
use axum::extract::rejection::JsonRejection;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Error codes for API responses.
///
/// These codes are stable and can be used by clients for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No bearer token provided
    AuthRequired,
    /// Bearer token invalid or expired
    InvalidToken,
    /// Request body is malformed
    InvalidRequestBody,
    /// Field value is invalid
    ValidationFailed,
    /// Placement refers to a page the document does not have
    PageOutOfRange,
    DocumentNotFound,
    AlreadyFinalized,
    FinalizationInProgress,
    NoPlacements,
    InvalidLink,
    LinkExpired,
    InternalError,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::InvalidRequestBody, message)
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InternalError,
            "internal server error",
        )
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err {
            Error::NotFound => {
                Self::new(StatusCode::NOT_FOUND, ErrorCode::DocumentNotFound, message)
            }
            Error::AlreadyFinalized => {
                Self::new(StatusCode::BAD_REQUEST, ErrorCode::AlreadyFinalized, message)
            }
            Error::FinalizationInProgress(_) => Self::new(
                StatusCode::CONFLICT,
                ErrorCode::FinalizationInProgress,
                message,
            ),
            Error::NoPlacements => {
                Self::new(StatusCode::BAD_REQUEST, ErrorCode::NoPlacements, message)
            }
            Error::InvalidLink => Self::new(StatusCode::NOT_FOUND, ErrorCode::InvalidLink, message),
            Error::Expired => Self::new(StatusCode::BAD_REQUEST, ErrorCode::LinkExpired, message),
            Error::Unauthorized(_) => {
                Self::new(StatusCode::UNAUTHORIZED, ErrorCode::InvalidToken, message)
            }
            Error::PageOutOfRange { .. } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::PageOutOfRange,
                message,
            ),
            Error::Validation(_) | Error::Base64(_) | Error::Png(_) => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::ValidationFailed,
                message,
            ),
            other => {
                log::error!("Request failed: {}", other);
                Self::internal()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), ErrorCode::InvalidRequestBody, err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}
