//! Burning placed signatures into a signed copy of a document.

use crate::audit::{NewAuditEntry, ACTION_FINALIZED};
use crate::clock::Clock;
use crate::document::Document;
use crate::placement::{PlacementStatus, SignaturePlacement};
use crate::repository::{FinalizationCommit, Repository};
use crate::storage::{self, FileStorage};
use crate::{DocumentId, Error, PDFSigningDocument, UserId};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Reference to the signed copy produced by a finalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedArtifact {
    pub document_id: DocumentId,
    /// Storage path of the signed PDF.
    pub path: String,
    /// Hex encoded SHA-256 of the signed PDF.
    pub sha256: String,
    /// Number of placements drawn.
    pub placements: usize,
}

/// Name of the signed copy of the original stored as `stored_name`.
/// Stored names are unique per upload, so signed copies of different documents never share a file.
pub fn signed_file_name(stored_name: &str) -> String {
    format!("signed_{}", stored_name)
}

/// Draw every placement onto `pdf_data` and return the new PDF.
/// Any placement that cannot be drawn (e.g. a page that does not exist) fails the whole render.
pub fn render_signed_pdf(
    pdf_data: &[u8],
    placements: &[SignaturePlacement],
) -> Result<Vec<u8>, Error> {
    let mut pdf_signing_document = PDFSigningDocument::load(pdf_data)?;
    let page_count = pdf_signing_document.page_count();
    // Check every page up front so a bad placement fails before any drawing work.
    if let Some(placement) = placements
        .iter()
        .find(|placement| placement.page == 0 || placement.page as usize > page_count)
    {
        return Err(Error::PageOutOfRange {
            page: placement.page,
            page_count,
        });
    }
    for placement in placements {
        pdf_signing_document.apply_placement(placement)?;
    }
    pdf_signing_document.save_to_vec()
}

/// Removes the document from the in-flight set when dropped.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<DocumentId>>,
    document_id: DocumentId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.document_id);
    }
}

pub struct FinalizationEngine {
    repository: Arc<dyn Repository>,
    storage: Arc<dyn FileStorage>,
    clock: Arc<dyn Clock>,
    in_flight: Mutex<HashSet<DocumentId>>,
}

impl FinalizationEngine {
    pub fn new(
        repository: Arc<dyn Repository>,
        storage: Arc<dyn FileStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        FinalizationEngine {
            repository,
            storage,
            clock,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Sign `document_id` on behalf of its owner.
    ///
    /// The signed copy is written under a staging name and published before the records
    /// are committed. If the commit fails the published copy is removed again, so a
    /// document is only ever marked signed once its signed copy exists.
    pub fn finalize(
        &self,
        document_id: DocumentId,
        requesting_user: UserId,
    ) -> Result<SignedArtifact, Error> {
        self.check_finalizable(document_id, requesting_user)?;
        let _guard = self.claim(document_id)?;
        // Another call may have finished between the first check and the claim.
        let document = self.check_finalizable(document_id, requesting_user)?;

        let placements: Vec<SignaturePlacement> = self
            .repository
            .placements_for_document(document_id)?
            .into_iter()
            .filter(|placement| placement.status == PlacementStatus::Pending)
            .collect();
        if placements.is_empty() {
            return Err(Error::NoPlacements);
        }

        let original = self.storage.get(&document.file_path)?;
        let signed = render_signed_pdf(&original, &placements)?;
        let sha256 = format!("{:x}", Sha256::digest(&signed));

        let stored_name = storage::name_from_path(&document.file_path)?;
        let staged = self
            .storage
            .stage(&signed_file_name(stored_name), &signed)?;
        let path = self.storage.publish(staged)?;

        let commit = FinalizationCommit {
            document_id,
            signed_path: path.clone(),
            placement_ids: placements.iter().map(|placement| placement.id).collect(),
            audit: NewAuditEntry::new(
                requesting_user,
                document_id,
                ACTION_FINALIZED,
                self.clock.now(),
            ),
        };
        if let Err(err) = self.repository.commit_finalization(commit) {
            // On `AlreadyFinalized` the path belongs to the winning finalization now.
            if matches!(err, Error::AlreadyFinalized) {
                return Err(err);
            }
            if let Err(cleanup_err) = self.storage.remove(&path) {
                log::warn!(
                    "Could not remove `{}` after failed commit of document {}: {}",
                    path,
                    document_id,
                    cleanup_err
                );
            }
            return Err(err);
        }

        log::info!(
            "User {} finalized document {} with {} signature(s) into `{}`.",
            requesting_user,
            document_id,
            placements.len(),
            path
        );
        Ok(SignedArtifact {
            document_id,
            path,
            sha256,
            placements: placements.len(),
        })
    }

    fn check_finalizable(
        &self,
        document_id: DocumentId,
        requesting_user: UserId,
    ) -> Result<Document, Error> {
        let document = self
            .repository
            .document(document_id)?
            .filter(|document| document.is_owned_by(requesting_user))
            .ok_or(Error::NotFound)?;
        if !document.is_pending() {
            return Err(Error::AlreadyFinalized);
        }
        Ok(document)
    }

    fn claim(&self, document_id: DocumentId) -> Result<InFlightGuard<'_>, Error> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !in_flight.insert(document_id) {
            return Err(Error::FinalizationInProgress(document_id));
        }
        Ok(InFlightGuard {
            in_flight: &self.in_flight,
            document_id,
        })
    }
}
