//! Document, placement and audit records.

use crate::audit::{AuditEntry, NewAuditEntry, ACTION_UPLOADED};
use crate::document::{Document, DocumentStatus, NewDocument};
use crate::placement::{NewPlacement, PlacementStatus, SignaturePlacement};
use crate::public_link::PublicLink;
use crate::{DocumentId, Error, PlacementId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Everything that changes when a document is finalized, applied as one unit.
#[derive(Debug, Clone)]
pub struct FinalizationCommit {
    pub document_id: DocumentId,
    pub signed_path: String,
    pub placement_ids: Vec<PlacementId>,
    pub audit: NewAuditEntry,
}

pub trait Repository: Send + Sync {
    /// Insert a pending document and record its upload by the owner in the audit log.
    fn insert_document(
        &self,
        document: NewDocument,
        created_at: DateTime<Utc>,
    ) -> Result<Document, Error>;

    fn document(&self, id: DocumentId) -> Result<Option<Document>, Error>;

    fn documents_by_owner(&self, owner_id: UserId) -> Result<Vec<Document>, Error>;

    /// The public document carrying `token`, expired or not.
    fn document_by_token(&self, token: &str) -> Result<Option<Document>, Error>;

    /// Attach `link` to the document together with its audit entry.
    fn set_public_link(
        &self,
        id: DocumentId,
        link: &PublicLink,
        audit: NewAuditEntry,
    ) -> Result<Document, Error>;

    /// Insert a placement together with its audit entry.
    /// Fails with `AlreadyFinalized` if the document is no longer pending.
    fn insert_placement(
        &self,
        placement: NewPlacement,
        audit: NewAuditEntry,
    ) -> Result<SignaturePlacement, Error>;

    fn placements_for_document(
        &self,
        document_id: DocumentId,
    ) -> Result<Vec<SignaturePlacement>, Error>;

    fn append_audit(&self, entry: NewAuditEntry) -> Result<AuditEntry, Error>;

    fn audit_for_document(&self, document_id: DocumentId) -> Result<Vec<AuditEntry>, Error>;

    /// Transition a document pending -> signed.
    /// Fails with `AlreadyFinalized`, changing nothing, unless the document is still pending.
    fn commit_finalization(&self, commit: FinalizationCommit) -> Result<Document, Error>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Tables {
    next_id: i64,
    documents: BTreeMap<DocumentId, Document>,
    placements: BTreeMap<PlacementId, SignaturePlacement>,
    audit: Vec<AuditEntry>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn push_audit(&mut self, entry: NewAuditEntry) -> AuditEntry {
        let entry = AuditEntry {
            id: self.allocate_id(),
            user_id: entry.user_id,
            document_id: entry.document_id,
            action: entry.action,
            timestamp: entry.timestamp,
        };
        self.audit.push(entry.clone());
        entry
    }
}

/// Records held in memory, optionally snapshotted to a JSON file after every change.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the snapshot at `path` (if it exists) and keep it up to date.
    pub fn persistent<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let tables = if path.exists() {
            let data = fs::read(&path)?;
            serde_json::from_slice(&data)?
        } else {
            Tables::default()
        };
        log::info!("Records are persisted to `{}`.", path.display());
        Ok(MemoryRepository {
            tables: Mutex::new(tables),
            snapshot_path: Some(path),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `change` on a copy of the tables and only keep it once it has been persisted.
    fn transaction<T, F>(&self, change: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Tables) -> Result<T, Error>,
    {
        let mut tables = self.lock();
        let mut working = tables.clone();
        let result = change(&mut working)?;
        if let Some(path) = &self.snapshot_path {
            Self::write_snapshot(path, &working)?;
        }
        *tables = working;
        Ok(result)
    }

    fn write_snapshot(path: &Path, tables: &Tables) -> Result<(), Error> {
        let data = serde_json::to_vec_pretty(tables)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, data)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

impl Repository for MemoryRepository {
    fn insert_document(
        &self,
        document: NewDocument,
        created_at: DateTime<Utc>,
    ) -> Result<Document, Error> {
        self.transaction(|tables| {
            let document = Document {
                id: tables.allocate_id(),
                filename: document.filename,
                file_path: document.file_path,
                owner_id: document.owner_id,
                status: DocumentStatus::Pending,
                public_token: None,
                is_public: false,
                public_expires_at: None,
                signed_path: None,
                created_at,
            };
            tables.documents.insert(document.id, document.clone());
            tables.push_audit(NewAuditEntry::new(
                document.owner_id,
                document.id,
                ACTION_UPLOADED,
                created_at,
            ));
            Ok(document)
        })
    }

    fn document(&self, id: DocumentId) -> Result<Option<Document>, Error> {
        Ok(self.lock().documents.get(&id).cloned())
    }

    fn documents_by_owner(&self, owner_id: UserId) -> Result<Vec<Document>, Error> {
        Ok(self
            .lock()
            .documents
            .values()
            .filter(|document| document.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn document_by_token(&self, token: &str) -> Result<Option<Document>, Error> {
        Ok(self
            .lock()
            .documents
            .values()
            .find(|document| document.is_public && document.public_token.as_deref() == Some(token))
            .cloned())
    }

    fn set_public_link(
        &self,
        id: DocumentId,
        link: &PublicLink,
        audit: NewAuditEntry,
    ) -> Result<Document, Error> {
        self.transaction(|tables| {
            let document = tables.documents.get_mut(&id).ok_or(Error::NotFound)?;
            document.public_token = Some(link.token.clone());
            document.is_public = true;
            document.public_expires_at = Some(link.expires_at);
            let document = document.clone();
            tables.push_audit(audit);
            Ok(document)
        })
    }

    fn insert_placement(
        &self,
        placement: NewPlacement,
        audit: NewAuditEntry,
    ) -> Result<SignaturePlacement, Error> {
        self.transaction(|tables| {
            let document = tables
                .documents
                .get(&placement.document_id)
                .ok_or(Error::NotFound)?;
            if !document.is_pending() {
                return Err(Error::AlreadyFinalized);
            }
            let placement = SignaturePlacement {
                id: tables.allocate_id(),
                document_id: placement.document_id,
                user_id: placement.user_id,
                page: placement.page,
                x: placement.x,
                y: placement.y,
                content: placement.content,
                status: PlacementStatus::Pending,
            };
            tables.placements.insert(placement.id, placement.clone());
            tables.push_audit(audit);
            Ok(placement)
        })
    }

    fn placements_for_document(
        &self,
        document_id: DocumentId,
    ) -> Result<Vec<SignaturePlacement>, Error> {
        Ok(self
            .lock()
            .placements
            .values()
            .filter(|placement| placement.document_id == document_id)
            .cloned()
            .collect())
    }

    fn append_audit(&self, entry: NewAuditEntry) -> Result<AuditEntry, Error> {
        self.transaction(|tables| Ok(tables.push_audit(entry)))
    }

    fn audit_for_document(&self, document_id: DocumentId) -> Result<Vec<AuditEntry>, Error> {
        Ok(self
            .lock()
            .audit
            .iter()
            .filter(|entry| entry.document_id == document_id)
            .cloned()
            .collect())
    }

    fn commit_finalization(&self, commit: FinalizationCommit) -> Result<Document, Error> {
        self.transaction(|tables| {
            let document = tables
                .documents
                .get_mut(&commit.document_id)
                .ok_or(Error::NotFound)?;
            if !document.is_pending() {
                return Err(Error::AlreadyFinalized);
            }
            document.status = DocumentStatus::Signed;
            document.signed_path = Some(commit.signed_path);
            let document = document.clone();

            for placement_id in &commit.placement_ids {
                match tables.placements.get_mut(placement_id) {
                    Some(placement) if placement.document_id == commit.document_id => {
                        placement.status = PlacementStatus::Signed;
                    }
                    _ => {
                        return Err(Error::Other(format!(
                            "placement {} does not belong to document {}",
                            placement_id, commit.document_id
                        )))
                    }
                }
            }
            tables.push_audit(commit.audit);
            Ok(document)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{ACTION_FINALIZED, ACTION_LINK_ISSUED};
    use crate::placement::PlacementContent;

    fn new_document(owner_id: UserId) -> NewDocument {
        NewDocument {
            filename: "a.pdf".to_owned(),
            file_path: "uploads/a.pdf".to_owned(),
            owner_id,
        }
    }

    fn new_placement(document_id: DocumentId) -> NewPlacement {
        NewPlacement {
            document_id,
            user_id: 1,
            page: 1,
            x: 10.0,
            y: 20.0,
            content: PlacementContent::Text("Alice".to_owned()),
        }
    }

    fn finalization(document_id: DocumentId, placement_ids: Vec<PlacementId>) -> FinalizationCommit {
        FinalizationCommit {
            document_id,
            signed_path: "uploads/signed_a.pdf".to_owned(),
            placement_ids,
            audit: NewAuditEntry::new(1, document_id, ACTION_FINALIZED, Utc::now()),
        }
    }

    #[test]
    fn commit_is_compare_and_swap() {
        let repo = MemoryRepository::new();
        let document = repo.insert_document(new_document(1), Utc::now()).unwrap();
        let placement = repo
            .insert_placement(
                new_placement(document.id),
                NewAuditEntry::new(1, document.id, "Placed signature", Utc::now()),
            )
            .unwrap();

        let signed = repo
            .commit_finalization(finalization(document.id, vec![placement.id]))
            .unwrap();
        assert_eq!(signed.status, DocumentStatus::Signed);
        assert_eq!(signed.signed_path.as_deref(), Some("uploads/signed_a.pdf"));

        let second = repo.commit_finalization(finalization(document.id, vec![placement.id]));
        assert!(matches!(second, Err(Error::AlreadyFinalized)));
        // Upload, placement and one finalization; the failed commit added nothing.
        assert_eq!(repo.audit_for_document(document.id).unwrap().len(), 3);
        let placements = repo.placements_for_document(document.id).unwrap();
        assert_eq!(placements[0].status, PlacementStatus::Signed);
    }

    #[test]
    fn failed_commit_changes_nothing() {
        let repo = MemoryRepository::new();
        let document = repo.insert_document(new_document(1), Utc::now()).unwrap();
        let other = repo.insert_document(new_document(1), Utc::now()).unwrap();
        let foreign = repo
            .insert_placement(
                new_placement(other.id),
                NewAuditEntry::new(1, other.id, "Placed signature", Utc::now()),
            )
            .unwrap();

        let result = repo.commit_finalization(finalization(document.id, vec![foreign.id]));
        assert!(result.is_err());
        assert!(repo.document(document.id).unwrap().unwrap().is_pending());
        let actions: Vec<String> = repo
            .audit_for_document(document.id)
            .unwrap()
            .into_iter()
            .map(|entry| entry.action)
            .collect();
        assert_eq!(actions, vec![ACTION_UPLOADED.to_owned()]);
    }

    #[test]
    fn placements_are_refused_on_signed_documents() {
        let repo = MemoryRepository::new();
        let document = repo.insert_document(new_document(1), Utc::now()).unwrap();
        repo.commit_finalization(finalization(document.id, vec![]))
            .unwrap();

        let result = repo.insert_placement(
            new_placement(document.id),
            NewAuditEntry::new(1, document.id, "Placed signature", Utc::now()),
        );
        assert!(matches!(result, Err(Error::AlreadyFinalized)));
    }

    #[test]
    fn token_lookup_only_finds_public_documents() {
        let repo = MemoryRepository::new();
        let document = repo.insert_document(new_document(1), Utc::now()).unwrap();
        assert!(repo.document_by_token("abc").unwrap().is_none());

        let link = PublicLink {
            token: "abc".to_owned(),
            expires_at: Utc::now(),
        };
        repo.set_public_link(
            document.id,
            &link,
            NewAuditEntry::new(1, document.id, ACTION_LINK_ISSUED, Utc::now()),
        )
        .unwrap();
        let found = repo.document_by_token("abc").unwrap().unwrap();
        assert_eq!(found.id, document.id);
        assert!(found.is_public);
    }

    #[test]
    fn state_changes_carry_their_audit_entries() {
        let repo = MemoryRepository::new();
        let document = repo.insert_document(new_document(3), Utc::now()).unwrap();
        let link = PublicLink {
            token: "xyz".to_owned(),
            expires_at: Utc::now(),
        };
        repo.set_public_link(
            document.id,
            &link,
            NewAuditEntry::new(3, document.id, ACTION_LINK_ISSUED, Utc::now()),
        )
        .unwrap();
        repo.append_audit(NewAuditEntry::new(3, document.id, "Viewed document", Utc::now()))
            .unwrap();

        let audit = repo.audit_for_document(document.id).unwrap();
        let actions: Vec<&str> = audit.iter().map(|entry| entry.action.as_str()).collect();
        assert_eq!(
            actions,
            vec![ACTION_UPLOADED, ACTION_LINK_ISSUED, "Viewed document"]
        );
        assert!(audit.iter().all(|entry| entry.user_id == 3));

        // A link for a missing document records nothing.
        let missing = repo.set_public_link(
            document.id + 100,
            &link,
            NewAuditEntry::new(3, document.id + 100, ACTION_LINK_ISSUED, Utc::now()),
        );
        assert!(matches!(missing, Err(Error::NotFound)));
        assert_eq!(repo.audit_for_document(document.id + 100).unwrap().len(), 0);
    }

    #[test]
    fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let id = {
            let repo = MemoryRepository::persistent(&path).unwrap();
            let document = repo.insert_document(new_document(7), Utc::now()).unwrap();
            repo.insert_placement(
                new_placement(document.id),
                NewAuditEntry::new(7, document.id, "Placed signature", Utc::now()),
            )
            .unwrap();
            document.id
        };

        let repo = MemoryRepository::persistent(&path).unwrap();
        assert_eq!(repo.documents_by_owner(7).unwrap().len(), 1);
        assert_eq!(repo.placements_for_document(id).unwrap().len(), 1);
        // Ids keep counting from where they were.
        let next = repo.insert_document(new_document(7), Utc::now()).unwrap();
        assert!(next.id > id);
    }
}
