use crate::DocumentId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Document or placement is absent, or not owned by the caller.
    #[error("document not found")]
    NotFound,
    #[error("document already finalized")]
    AlreadyFinalized,
    #[error("finalization of document {0} is already in progress")]
    FinalizationInProgress(DocumentId),
    #[error("no signatures found")]
    NoPlacements,
    #[error("invalid link")]
    InvalidLink,
    #[error("public link expired")]
    Expired,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("page {page} does not exist, document has {page_count} page(s)")]
    PageOutOfRange { page: u32, page_count: usize },
    #[error("pdf error: {0}")]
    LoPdf(#[from] lopdf::Error),
    #[error("png error: {0}")]
    Png(#[from] png::DecodingError),
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Self::Other(err.to_owned())
    }
}
