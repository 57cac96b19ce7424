//! Generatable-document repository.
//!
//! The repository is the only owner of the PDF record's `dirty`/`url` pair.
//! `mark_clean`, `mark_dirty` and `save_and_invalidate` are single atomic
//! writes; `save` persists the document body and never touches the PDF record.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use docforge_core::DocumentId;
use docforge_documents::{CleanOutcome, Document, DocumentKind};

pub use in_memory::InMemoryDocumentRepository;
pub use postgres::PostgresDocumentRepository;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RepositoryError {
    #[error("document not found: {kind} {id}")]
    NotFound { kind: DocumentKind, id: DocumentId },
    #[error("document {kind} {id} has no pdf record")]
    MissingPdf { kind: DocumentKind, id: DocumentId },
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("repository state poisoned")]
    Poisoned,
}

pub trait DocumentRepository: Send + Sync {
    /// Ids of documents of `kind` whose PDF is stale.
    fn find_stale(&self, kind: DocumentKind) -> Result<Vec<DocumentId>, RepositoryError>;

    /// Whether the document's PDF is stale. Documents without a PDF record are not.
    fn is_dirty(&self, kind: DocumentKind, id: DocumentId) -> Result<bool, RepositoryError>;

    /// Document body with its current PDF record attached.
    fn load(&self, kind: DocumentKind, id: DocumentId) -> Result<Option<Document>, RepositoryError>;

    /// Atomically set the url and retire `observed_dirty` invalidations.
    fn mark_clean(
        &self,
        kind: DocumentKind,
        id: DocumentId,
        url: &str,
        observed_dirty: u32,
    ) -> Result<CleanOutcome, RepositoryError>;

    /// Persist the document body (insert or update).
    fn save(&self, document: &Document) -> Result<(), RepositoryError>;

    /// Atomically bump the dirty counter, creating the PDF record if missing.
    fn mark_dirty(
        &self,
        kind: DocumentKind,
        id: DocumentId,
        upload_path: &str,
    ) -> Result<(), RepositoryError>;

    /// Persist the document body and bump its dirty counter by `invalidations`
    /// in one atomic write. The PDF record is created at the document's upload
    /// path if missing; with zero invalidations this is a plain `save`.
    fn save_and_invalidate(
        &self,
        document: &Document,
        invalidations: u32,
    ) -> Result<(), RepositoryError>;
}

impl<R> DocumentRepository for Arc<R>
where
    R: DocumentRepository + ?Sized,
{
    fn find_stale(&self, kind: DocumentKind) -> Result<Vec<DocumentId>, RepositoryError> {
        (**self).find_stale(kind)
    }

    fn is_dirty(&self, kind: DocumentKind, id: DocumentId) -> Result<bool, RepositoryError> {
        (**self).is_dirty(kind, id)
    }

    fn load(&self, kind: DocumentKind, id: DocumentId) -> Result<Option<Document>, RepositoryError> {
        (**self).load(kind, id)
    }

    fn mark_clean(
        &self,
        kind: DocumentKind,
        id: DocumentId,
        url: &str,
        observed_dirty: u32,
    ) -> Result<CleanOutcome, RepositoryError> {
        (**self).mark_clean(kind, id, url, observed_dirty)
    }

    fn save(&self, document: &Document) -> Result<(), RepositoryError> {
        (**self).save(document)
    }

    fn mark_dirty(
        &self,
        kind: DocumentKind,
        id: DocumentId,
        upload_path: &str,
    ) -> Result<(), RepositoryError> {
        (**self).mark_dirty(kind, id, upload_path)
    }

    fn save_and_invalidate(
        &self,
        document: &Document,
        invalidations: u32,
    ) -> Result<(), RepositoryError> {
        (**self).save_and_invalidate(document, invalidations)
    }
}
