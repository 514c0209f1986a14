//! REST API.
//!
//! Everything under `/api` except public link resolution needs a bearer token.

pub mod audit;
pub mod auth;
pub mod documents;
pub mod error;
pub mod files;
pub mod health;
pub mod signatures;

use crate::service::SigningService;
use crate::Error;
use auth::JwtValidator;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub use error::{ApiError, ErrorCode};

/// Shared state of all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SigningService>,
    pub jwt: Arc<JwtValidator>,
    /// Public links are handed out as `<public_link_base>/<token>`.
    pub public_link_base: String,
    pub max_upload_bytes: usize,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/docs/upload", post(documents::upload))
        .route("/api/docs/", get(documents::list))
        .route(
            "/api/docs/generate-link/:doc_id",
            post(documents::generate_link),
        )
        .route("/api/signatures/", post(signatures::create))
        .route("/api/signatures/:doc_id", get(signatures::list))
        .route(
            "/api/signatures/finalize/:doc_id",
            post(signatures::finalize),
        )
        .route("/api/audit/:doc_id", get(audit::list))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_user,
        ));

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/api/docs/public/:token", get(documents::public_document))
        .route("/uploads/:name", get(files::serve_upload))
        .merge(protected)
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .with_state(state)
}

/// Run a service call on the blocking pool. PDF rendering and file IO are synchronous.
pub(crate) async fn blocking<T, F>(state: &AppState, call: F) -> Result<T, ApiError>
where
    F: FnOnce(&SigningService) -> Result<T, Error> + Send + 'static,
    T: Send + 'static,
{
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || call(&service))
        .await
        .map_err(|err| {
            log::error!("Blocking task failed: {}", err);
            ApiError::internal()
        })?
        .map_err(ApiError::from)
}
