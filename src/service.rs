//! Use cases behind the HTTP endpoints.

use crate::audit::{AuditEntry, NewAuditEntry, ACTION_LINK_ISSUED, ACTION_PLACED};
use crate::clock::Clock;
use crate::document::{sanitize_filename, Document, NewDocument};
use crate::finalize::{FinalizationEngine, SignedArtifact};
use crate::placement::{NewPlacement, PlacementContent, SignaturePlacement};
use crate::public_link::{self, PublicLink};
use crate::repository::Repository;
use crate::storage::FileStorage;
use crate::{DocumentId, Error, PDFSigningDocument, UserId};
use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

/// A placement as requested by a client, before validation.
#[derive(Debug, Clone)]
pub struct PlacementRequest {
    pub document_id: DocumentId,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub content: PlacementContent,
}

pub struct SigningService {
    repository: Arc<dyn Repository>,
    storage: Arc<dyn FileStorage>,
    clock: Arc<dyn Clock>,
    engine: FinalizationEngine,
    link_ttl: Duration,
}

impl SigningService {
    pub fn new(
        repository: Arc<dyn Repository>,
        storage: Arc<dyn FileStorage>,
        clock: Arc<dyn Clock>,
        link_ttl: Duration,
    ) -> Self {
        let engine = FinalizationEngine::new(repository.clone(), storage.clone(), clock.clone());
        SigningService {
            repository,
            storage,
            clock,
            engine,
            link_ttl,
        }
    }

    /// Store an uploaded PDF and create its pending document.
    pub fn upload_document(
        &self,
        owner_id: UserId,
        filename: &str,
        bytes: &[u8],
    ) -> Result<Document, Error> {
        let filename = sanitize_filename(filename)
            .ok_or_else(|| Error::Validation("missing or invalid file name".to_owned()))?;
        if !bytes.starts_with(b"%PDF-") {
            return Err(Error::Validation("uploaded file is not a PDF".to_owned()));
        }
        let page_count = PDFSigningDocument::load(bytes)
            .map(|pdf| pdf.page_count())
            .unwrap_or(0);
        if page_count == 0 {
            return Err(Error::Validation(
                "uploaded PDF is unreadable or has no pages".to_owned(),
            ));
        }
        // Unique storage name, different uploads may share a client file name.
        let storage_name = format!("{}_{}", Uuid::new_v4().simple(), filename);
        let file_path = self.storage.put(&storage_name, bytes)?;

        let document = match self.repository.insert_document(
            NewDocument {
                filename,
                file_path: file_path.clone(),
                owner_id,
            },
            self.clock.now(),
        ) {
            Ok(document) => document,
            Err(err) => {
                if let Err(cleanup_err) = self.storage.remove(&file_path) {
                    log::warn!("Could not remove orphaned upload `{}`: {}", file_path, cleanup_err);
                }
                return Err(err);
            }
        };
        log::info!(
            "User {} uploaded document {} (`{}`, {} bytes).",
            owner_id,
            document.id,
            document.filename,
            bytes.len()
        );
        Ok(document)
    }

    pub fn list_documents(&self, owner_id: UserId) -> Result<Vec<Document>, Error> {
        self.repository.documents_by_owner(owner_id)
    }

    /// The document if it exists and `user_id` owns it, `NotFound` otherwise.
    pub fn owned_document(&self, user_id: UserId, document_id: DocumentId) -> Result<Document, Error> {
        self.repository
            .document(document_id)?
            .filter(|document| document.is_owned_by(user_id))
            .ok_or(Error::NotFound)
    }

    pub fn place_signature(
        &self,
        user_id: UserId,
        request: PlacementRequest,
    ) -> Result<SignaturePlacement, Error> {
        let document = self.owned_document(user_id, request.document_id)?;
        if !document.is_pending() {
            return Err(Error::AlreadyFinalized);
        }
        if !request.x.is_finite() || !request.y.is_finite() {
            return Err(Error::Validation("coordinates must be finite numbers".to_owned()));
        }
        if let PlacementContent::Image { media_type, .. } = &request.content {
            if media_type != "image/png" {
                return Err(Error::Validation(format!(
                    "unsupported signature image type `{}`, only image/png is accepted",
                    media_type
                )));
            }
        }
        let page_count = self.page_count(&document)?;
        if request.page == 0 || request.page as usize > page_count {
            return Err(Error::PageOutOfRange {
                page: request.page,
                page_count,
            });
        }

        let placement = self.repository.insert_placement(
            NewPlacement {
                document_id: document.id,
                user_id,
                page: request.page,
                x: request.x,
                y: request.y,
                content: request.content,
            },
            NewAuditEntry::new(user_id, document.id, ACTION_PLACED, self.clock.now()),
        )?;
        log::info!(
            "User {} placed {} signature {} on page {} of document {}.",
            user_id,
            if placement.content.is_image() { "drawn" } else { "typed" },
            placement.id,
            placement.page,
            document.id
        );
        Ok(placement)
    }

    pub fn list_placements(
        &self,
        user_id: UserId,
        document_id: DocumentId,
    ) -> Result<Vec<SignaturePlacement>, Error> {
        self.owned_document(user_id, document_id)?;
        self.repository.placements_for_document(document_id)
    }

    pub fn finalize(
        &self,
        document_id: DocumentId,
        requesting_user: UserId,
    ) -> Result<SignedArtifact, Error> {
        self.engine.finalize(document_id, requesting_user)
    }

    pub fn issue_link(&self, document_id: DocumentId, owner_id: UserId) -> Result<PublicLink, Error> {
        self.owned_document(owner_id, document_id)?;
        let link = PublicLink::issue(self.clock.now(), self.link_ttl)?;
        self.repository.set_public_link(
            document_id,
            &link,
            NewAuditEntry::new(owner_id, document_id, ACTION_LINK_ISSUED, self.clock.now()),
        )?;
        log::info!(
            "User {} issued a public link for document {} valid until {}.",
            owner_id,
            document_id,
            link.expires_at
        );
        Ok(link)
    }

    pub fn resolve_link(&self, token: &str) -> Result<Document, Error> {
        let document = self
            .repository
            .document_by_token(token)?
            .ok_or(Error::InvalidLink)?;
        public_link::check_access(&document, self.clock.now())?;
        Ok(document)
    }

    pub fn audit_log(
        &self,
        user_id: UserId,
        document_id: DocumentId,
    ) -> Result<Vec<AuditEntry>, Error> {
        self.owned_document(user_id, document_id)?;
        self.repository.audit_for_document(document_id)
    }

    /// Bytes of a stored original or signed copy, by storage path.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>, Error> {
        self.storage.get(path)
    }

    fn page_count(&self, document: &Document) -> Result<usize, Error> {
        let bytes = self.storage.get(&document.file_path)?;
        Ok(PDFSigningDocument::load(&bytes)?.page_count())
    }
}
