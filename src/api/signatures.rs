//! Signature placement and finalization.

use super::auth::AuthUser;
use super::error::ApiError;
use super::{blocking, AppState};
use crate::placement::{PlacementContent, SignaturePlacement};
use crate::service::PlacementRequest;
use crate::DocumentId;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateSignatureRequest {
    pub document_id: DocumentId,
    pub x: f64,
    pub y: f64,
    pub page: u32,
    /// Typed text, or a `data:image/png;base64,` URL for a drawn signature.
    pub signature_text: String,
}

#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub message: &'static str,
    pub signed_file: String,
    pub sha256: String,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    body: Result<Json<CreateSignatureRequest>, JsonRejection>,
) -> Result<Json<SignaturePlacement>, ApiError> {
    let Json(body) = body?;
    let request = PlacementRequest {
        document_id: body.document_id,
        page: body.page,
        x: body.x,
        y: body.y,
        content: PlacementContent::parse(&body.signature_text)?,
    };
    let placement = blocking(&state, move |service| {
        service.place_signature(user_id, request)
    })
    .await?;
    Ok(Json(placement))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(document_id): Path<DocumentId>,
) -> Result<Json<Vec<SignaturePlacement>>, ApiError> {
    let placements = blocking(&state, move |service| {
        service.list_placements(user_id, document_id)
    })
    .await?;
    Ok(Json(placements))
}

pub async fn finalize(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(document_id): Path<DocumentId>,
) -> Result<Json<FinalizeResponse>, ApiError> {
    let artifact = blocking(&state, move |service| service.finalize(document_id, user_id)).await?;
    Ok(Json(FinalizeResponse {
        message: "Document signed successfully",
        signed_file: artifact.path,
        sha256: artifact.sha256,
    }))
}
