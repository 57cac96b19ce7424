//! Document lifecycle service.
//!
//! Applies commands through the `Document` aggregate and persists the result.
//! Every event that changes what the PDF shows bumps the dirty counter in the
//! same write as the new body, which is what the dispatch sweep later picks up.

use tracing::{debug, info, instrument};

use docforge_core::{Aggregate, DocumentId, DomainError};
use docforge_documents::{Document, DocumentCommand, DocumentKind, DocumentLine};

use crate::repository::{DocumentRepository, RepositoryError};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("document not found: {kind} {id}")]
    NotFound { kind: DocumentKind, id: DocumentId },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct DocumentService<R> {
    repository: R,
}

impl<R: DocumentRepository> DocumentService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Persist a new draft. Drafts have no PDF and are never stale.
    #[instrument(skip(self, customer, currency, lines), fields(kind = %kind))]
    pub fn create_draft(
        &self,
        kind: DocumentKind,
        customer: impl Into<String>,
        currency: impl Into<String>,
        lines: Vec<DocumentLine>,
    ) -> Result<Document, LifecycleError> {
        let document = Document::draft(DocumentId::new(), kind, customer, currency, lines)?;
        self.repository.save(&document)?;
        debug!(document_id = %document.id_typed(), "draft created");
        Ok(document)
    }

    /// Apply `command` to a stored document and return its new state,
    /// PDF record included.
    #[instrument(skip(self, command), fields(kind = %kind, document_id = %id))]
    pub fn execute(
        &self,
        kind: DocumentKind,
        id: DocumentId,
        command: &DocumentCommand,
    ) -> Result<Document, LifecycleError> {
        let mut document = self
            .repository
            .load(kind, id)?
            .ok_or(LifecycleError::NotFound { kind, id })?;

        let events = document.handle(command)?;
        for event in &events {
            document.apply(event);
        }
        let invalidating: Vec<_> = events.iter().filter(|e| e.invalidates_pdf()).collect();
        let invalidations = u32::try_from(invalidating.len()).unwrap_or(u32::MAX);
        // Body and dirty bump land together or not at all.
        self.repository.save_and_invalidate(&document, invalidations)?;
        for event in invalidating {
            info!(event_type = event.event_type(), "pdf invalidated");
        }

        self.repository
            .load(kind, id)?
            .ok_or(LifecycleError::NotFound { kind, id })
    }
}
