use super::auth::AuthUser;
use super::error::ApiError;
use super::{blocking, AppState};
use crate::audit::AuditEntry;
use crate::DocumentId;
use axum::extract::{Extension, Path, State};
use axum::Json;

pub async fn list(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(document_id): Path<DocumentId>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    let entries = blocking(&state, move |service| service.audit_log(user_id, document_id)).await?;
    Ok(Json(entries))
}
