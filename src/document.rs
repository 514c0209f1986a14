use crate::{DocumentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Signed,
}

/// An uploaded PDF and its signing/sharing state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub filename: String,
    /// Storage path of the original bytes.
    pub file_path: String,
    pub owner_id: UserId,
    pub status: DocumentStatus,
    pub public_token: Option<String>,
    pub is_public: bool,
    pub public_expires_at: Option<DateTime<Utc>>,
    /// Storage path of the signed copy, set once finalized.
    pub signed_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }

    pub fn is_pending(&self) -> bool {
        self.status == DocumentStatus::Pending
    }
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub file_path: String,
    pub owner_id: UserId,
}

/// Reduce a client supplied file name to its last path component.
/// Both separators are handled because browsers on Windows send full paths.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let name = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." || name.chars().any(char::is_control) {
        None
    } else {
        Some(name.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_keeps_last_component() {
        assert_eq!(sanitize_filename("contract.pdf").as_deref(), Some("contract.pdf"));
        assert_eq!(
            sanitize_filename("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            sanitize_filename("C:\\Users\\bob\\nda.pdf").as_deref(),
            Some("nda.pdf")
        );
    }

    #[test]
    fn filename_rejects_empty_and_dot_names() {
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename("uploads/"), None);
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename("a\nb.pdf"), None);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&DocumentStatus::Signed).unwrap(),
            "\"signed\""
        );
    }
}
