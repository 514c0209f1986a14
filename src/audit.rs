use crate::{AuditEntryId, DocumentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ACTION_UPLOADED: &str = "Uploaded document";
pub const ACTION_PLACED: &str = "Placed signature";
pub const ACTION_LINK_ISSUED: &str = "Generated public link";
pub const ACTION_FINALIZED: &str = "Finalized document";

/// Append-only record of a state changing action on a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub user_id: UserId,
    pub document_id: DocumentId,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub user_id: UserId,
    pub document_id: DocumentId,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

impl NewAuditEntry {
    pub fn new(
        user_id: UserId,
        document_id: DocumentId,
        action: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        NewAuditEntry {
            user_id,
            document_id,
            action: action.to_owned(),
            timestamp,
        }
    }
}
