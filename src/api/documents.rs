//! Upload, listing and public sharing of documents.

use super::auth::AuthUser;
use super::error::ApiError;
use super::{blocking, AppState};
use crate::document::Document;
use crate::DocumentId;
use axum::extract::{Extension, Multipart, Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Multipart field carrying the PDF.
const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub document_id: DocumentId,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub public_link: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn upload(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_owned();
        let bytes = field.bytes().await?;
        upload = Some((filename, bytes));
        break;
    }
    let (filename, bytes) = upload
        .ok_or_else(|| ApiError::bad_request(format!("missing `{}` field", UPLOAD_FIELD)))?;

    let document = blocking(&state, move |service| {
        service.upload_document(user_id, &filename, &bytes)
    })
    .await?;
    Ok(Json(UploadResponse {
        message: "File uploaded successfully",
        document_id: document.id,
    }))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let documents = blocking(&state, move |service| service.list_documents(user_id)).await?;
    Ok(Json(documents))
}

pub async fn generate_link(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(document_id): Path<DocumentId>,
) -> Result<Json<LinkResponse>, ApiError> {
    let link = blocking(&state, move |service| service.issue_link(document_id, user_id)).await?;
    Ok(Json(LinkResponse {
        public_link: format!("{}/{}", state.public_link_base, link.token),
        token: link.token,
        expires_at: link.expires_at,
    }))
}

/// Unauthenticated access to a shared document.
pub async fn public_document(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Document>, ApiError> {
    let document = blocking(&state, move |service| service.resolve_link(&token)).await?;
    Ok(Json(document))
}
