//! Download of stored originals and signed copies.

use super::error::ApiError;
use super::{blocking, AppState};
use crate::storage::UPLOADS_MOUNT;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;

pub async fn serve_upload(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let path = format!("{}/{}", UPLOADS_MOUNT, name);
    let bytes = blocking(&state, move |service| service.read_file(&path)).await?;
    let content_type = if name.to_ascii_lowercase().ends_with(".pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    };
    Ok(([(CONTENT_TYPE, content_type)], bytes))
}
