//! In-memory document repository for tests/dev.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::RwLock;

use docforge_core::DocumentId;
use docforge_documents::{CleanOutcome, Document, DocumentKind, PdfRecord};

use super::{DocumentRepository, RepositoryError};

#[derive(Debug, Clone)]
struct Row {
    body: Document,
    pdf: Option<PdfRecord>,
}

/// One lock guards body and PDF record together, so readers never observe a
/// half-applied clean write.
#[derive(Debug, Default)]
pub struct InMemoryDocumentRepository {
    rows: RwLock<HashMap<(DocumentKind, DocumentId), Row>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// PDF record as currently stored (test/diagnostic helper).
    pub fn pdf(&self, kind: DocumentKind, id: DocumentId) -> Option<PdfRecord> {
        self.rows
            .read()
            .ok()?
            .get(&(kind, id))
            .and_then(|r| r.pdf.clone())
    }
}

impl DocumentRepository for InMemoryDocumentRepository {
    fn find_stale(&self, kind: DocumentKind) -> Result<Vec<DocumentId>, RepositoryError> {
        let rows = self.rows.read().map_err(|_| RepositoryError::Poisoned)?;
        let mut ids: Vec<DocumentId> = rows
            .iter()
            .filter(|((k, _), row)| *k == kind && row.pdf.as_ref().is_some_and(PdfRecord::is_dirty))
            .map(|((_, id), _)| *id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn is_dirty(&self, kind: DocumentKind, id: DocumentId) -> Result<bool, RepositoryError> {
        let rows = self.rows.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(rows
            .get(&(kind, id))
            .and_then(|r| r.pdf.as_ref())
            .is_some_and(PdfRecord::is_dirty))
    }

    fn load(&self, kind: DocumentKind, id: DocumentId) -> Result<Option<Document>, RepositoryError> {
        let rows = self.rows.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(rows
            .get(&(kind, id))
            .map(|r| r.body.clone().with_pdf(r.pdf.clone())))
    }

    fn mark_clean(
        &self,
        kind: DocumentKind,
        id: DocumentId,
        url: &str,
        observed_dirty: u32,
    ) -> Result<CleanOutcome, RepositoryError> {
        let mut rows = self.rows.write().map_err(|_| RepositoryError::Poisoned)?;
        let row = rows
            .get_mut(&(kind, id))
            .ok_or(RepositoryError::NotFound { kind, id })?;
        let pdf = row
            .pdf
            .as_mut()
            .ok_or(RepositoryError::MissingPdf { kind, id })?;
        Ok(pdf.mark_clean(url, observed_dirty))
    }

    fn save(&self, document: &Document) -> Result<(), RepositoryError> {
        let mut rows = self.rows.write().map_err(|_| RepositoryError::Poisoned)?;
        let key = (document.kind(), document.id_typed());
        let body = document.clone().with_pdf(None);
        match rows.get_mut(&key) {
            Some(row) => row.body = body,
            None => {
                rows.insert(key, Row { body, pdf: None });
            }
        }
        Ok(())
    }

    fn mark_dirty(
        &self,
        kind: DocumentKind,
        id: DocumentId,
        upload_path: &str,
    ) -> Result<(), RepositoryError> {
        let mut rows = self.rows.write().map_err(|_| RepositoryError::Poisoned)?;
        let row = rows
            .get_mut(&(kind, id))
            .ok_or(RepositoryError::NotFound { kind, id })?;
        match row.pdf.as_mut() {
            Some(pdf) => pdf.mark_dirty(),
            None => row.pdf = Some(PdfRecord::new(upload_path)),
        }
        Ok(())
    }

    fn save_and_invalidate(
        &self,
        document: &Document,
        invalidations: u32,
    ) -> Result<(), RepositoryError> {
        let mut rows = self.rows.write().map_err(|_| RepositoryError::Poisoned)?;
        let body = document.clone().with_pdf(None);
        let row = match rows.entry((document.kind(), document.id_typed())) {
            Entry::Occupied(entry) => {
                let row = entry.into_mut();
                row.body = body;
                row
            }
            Entry::Vacant(entry) => entry.insert(Row { body, pdf: None }),
        };
        for _ in 0..invalidations {
            match row.pdf.as_mut() {
                Some(pdf) => pdf.mark_dirty(),
                None => row.pdf = Some(PdfRecord::new(document.upload_path())),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use docforge_core::Aggregate;
    use docforge_documents::{DocumentCommand, DocumentLine, IssueDocument};

    use super::*;

    fn saved_draft(repo: &InMemoryDocumentRepository, kind: DocumentKind) -> Document {
        let doc = Document::draft(
            DocumentId::new(),
            kind,
            "ACME",
            "EUR",
            vec![DocumentLine {
                description: "Widget".to_string(),
                quantity: 1,
                unit_price: 999,
            }],
        )
        .unwrap();
        repo.save(&doc).unwrap();
        doc
    }

    #[test]
    fn drafts_are_never_stale() {
        let repo = InMemoryDocumentRepository::new();
        let doc = saved_draft(&repo, DocumentKind::Invoice);

        assert!(repo.find_stale(DocumentKind::Invoice).unwrap().is_empty());
        assert!(!repo.is_dirty(DocumentKind::Invoice, doc.id_typed()).unwrap());
    }

    #[test]
    fn find_stale_is_scoped_by_kind() {
        let repo = InMemoryDocumentRepository::new();
        let inv = saved_draft(&repo, DocumentKind::Invoice);
        let pro = saved_draft(&repo, DocumentKind::Proforma);
        repo.mark_dirty(inv.kind(), inv.id_typed(), &inv.upload_path()).unwrap();
        repo.mark_dirty(pro.kind(), pro.id_typed(), &pro.upload_path()).unwrap();

        assert_eq!(repo.find_stale(DocumentKind::Invoice).unwrap(), vec![inv.id_typed()]);
        assert_eq!(repo.find_stale(DocumentKind::Proforma).unwrap(), vec![pro.id_typed()]);
    }

    #[test]
    fn mark_clean_removes_from_stale_set() {
        let repo = InMemoryDocumentRepository::new();
        let doc = saved_draft(&repo, DocumentKind::Invoice);
        let (kind, id) = (doc.kind(), doc.id_typed());
        repo.mark_dirty(kind, id, &doc.upload_path()).unwrap();

        let outcome = repo.mark_clean(kind, id, "/media/x.pdf", 1).unwrap();
        assert_eq!(outcome, CleanOutcome::Clean);
        assert!(repo.find_stale(kind).unwrap().is_empty());
        assert_eq!(repo.pdf(kind, id).unwrap().url(), Some("/media/x.pdf"));
    }

    #[test]
    fn save_never_overwrites_pdf_state() {
        let repo = InMemoryDocumentRepository::new();
        let mut doc = saved_draft(&repo, DocumentKind::Invoice);
        let (kind, id) = (doc.kind(), doc.id_typed());

        let events = doc
            .handle(&DocumentCommand::Issue(IssueDocument {
                number: 1,
                occurred_at: chrono::Utc::now(),
            }))
            .unwrap();
        doc.apply(&events[0]);
        repo.mark_dirty(kind, id, &doc.upload_path()).unwrap();
        repo.mark_clean(kind, id, "/media/x.pdf", 1).unwrap();

        // A stale in-memory copy with a dirty record is saved afterwards.
        repo.save(&doc).unwrap();
        assert!(!repo.is_dirty(kind, id).unwrap());

        let loaded = repo.load(kind, id).unwrap().unwrap();
        assert_eq!(loaded.number(), Some(1));
        assert_eq!(loaded.pdf().unwrap().url(), Some("/media/x.pdf"));
    }

    #[test]
    fn save_and_invalidate_writes_body_and_record_together() {
        let repo = InMemoryDocumentRepository::new();
        let mut doc = saved_draft(&repo, DocumentKind::Proforma);
        let (kind, id) = (doc.kind(), doc.id_typed());
        let events = doc
            .handle(&DocumentCommand::Issue(IssueDocument {
                number: 4,
                occurred_at: chrono::Utc::now(),
            }))
            .unwrap();
        doc.apply(&events[0]);

        repo.save_and_invalidate(&doc, 2).unwrap();

        let loaded = repo.load(kind, id).unwrap().unwrap();
        assert_eq!(loaded.number(), Some(4));
        let pdf = loaded.pdf().unwrap();
        assert_eq!(pdf.dirty_count(), 2);
        assert_eq!(pdf.upload_path(), doc.upload_path());
        assert_eq!(repo.find_stale(kind).unwrap(), vec![id]);
    }

    #[test]
    fn save_and_invalidate_without_invalidations_creates_no_record() {
        let repo = InMemoryDocumentRepository::new();
        let doc = Document::draft(DocumentId::new(), DocumentKind::Invoice, "ACME", "EUR", vec![])
            .unwrap();

        repo.save_and_invalidate(&doc, 0).unwrap();

        assert!(repo.load(doc.kind(), doc.id_typed()).unwrap().is_some());
        assert!(repo.pdf(doc.kind(), doc.id_typed()).is_none());
    }

    #[test]
    fn clean_of_unknown_document_is_not_found() {
        let repo = InMemoryDocumentRepository::new();
        let err = repo
            .mark_clean(DocumentKind::Invoice, DocumentId::new(), "u", 1)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }
}
