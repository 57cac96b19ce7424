//! Generation worker: executes one job end to end.
//!
//! A run walks `Started → Rechecked → Rendered → Stored → Cleaned` and always
//! ends `Released`. On start the worker claims the job's lease, exchanging the
//! dispatched token for its own, so a duplicated delivery of the same job
//! finds the lease gone. The lease is checked again before the artifact is
//! written and before the record is cleaned: a worker whose lease expired
//! mid-render never overwrites a newer owner's output. The claimed lease lives
//! in a [`LockGuard`] and is released on success, on error and on panic.

use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use docforge_core::DocumentId;
use docforge_documents::{CleanOutcome, DocumentKind};

use crate::lock::{LockError, LockGuard, LockManager};
use crate::render::{RenderError, Renderer};
use crate::repository::{DocumentRepository, RepositoryError};
use crate::storage::{ArtifactStorage, StorageError};

use super::job::GenerationJob;

/// Last state a run completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Started,
    Rechecked,
    Rendered,
    Stored,
    Cleaned,
}

impl GenerationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStage::Started => "started",
            GenerationStage::Rechecked => "rechecked",
            GenerationStage::Rendered => "rendered",
            GenerationStage::Stored => "stored",
            GenerationStage::Cleaned => "cleaned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// PDF stored and the document marked clean.
    Generated { url: String },
    /// Nothing to do: the document was already clean at the re-check.
    AlreadyClean,
    /// PDF stored, but the document was invalidated again while rendering;
    /// the next sweep picks it up.
    StillDirty { url: String },
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The job's lease expired or was taken over; another owner may be running.
    #[error("lease on {lock_key} is no longer held after {}", .stage.as_str())]
    LeaseLost {
        lock_key: String,
        stage: GenerationStage,
    },
    #[error("lock backend error: {0}")]
    Lock(#[source] LockError),
    #[error("document not found: {kind} {id}")]
    NotFound { kind: DocumentKind, id: DocumentId },
    #[error("render failed for {kind} {id}: {source}")]
    Render {
        kind: DocumentKind,
        id: DocumentId,
        #[source]
        source: RenderError,
    },
    #[error("storing pdf for {kind} {id} failed: {source}")]
    Storage {
        kind: DocumentKind,
        id: DocumentId,
        #[source]
        source: StorageError,
    },
    #[error("repository read failed: {0}")]
    RepositoryRead(#[source] RepositoryError),
    /// The PDF exists at `url` but the document is still flagged stale.
    #[error("marking {kind} {id} clean failed after storing {url}: {source}")]
    RepositoryWrite {
        kind: DocumentKind,
        id: DocumentId,
        url: String,
        #[source]
        source: RepositoryError,
    },
}

impl GenerationError {
    pub fn stage(&self) -> GenerationStage {
        match self {
            GenerationError::LeaseLost { stage, .. } => *stage,
            GenerationError::Lock(_)
            | GenerationError::NotFound { .. }
            | GenerationError::RepositoryRead(_) => GenerationStage::Started,
            GenerationError::Render { .. } => GenerationStage::Rechecked,
            GenerationError::Storage { .. } => GenerationStage::Rendered,
            GenerationError::RepositoryWrite { .. } => GenerationStage::Stored,
        }
    }
}

/// Runs generation jobs against explicit collaborators.
pub struct GenerationWorker<R, L, Rn, S> {
    repository: R,
    locks: L,
    renderer: Rn,
    storage: S,
    lease_ttl: Duration,
}

impl<R, L, Rn, S> GenerationWorker<R, L, Rn, S>
where
    R: DocumentRepository,
    L: LockManager,
    Rn: Renderer,
    S: ArtifactStorage,
{
    pub fn new(repository: R, locks: L, renderer: Rn, storage: S) -> Self {
        Self {
            repository,
            locks,
            renderer,
            storage,
            lease_ttl: Duration::from_secs(300),
        }
    }

    /// Lease taken when the worker claims a job's lock.
    pub fn with_lease_ttl(mut self, lease_ttl: Duration) -> Self {
        self.lease_ttl = lease_ttl;
        self
    }

    /// Execute `job`. Releases the job's lease before returning.
    #[instrument(
        skip(self, job),
        fields(job_id = %job.job_id, kind = %job.kind, document_id = %job.document_id)
    )]
    pub fn run(&self, job: &GenerationJob) -> Result<GenerationOutcome, GenerationError> {
        let result = self.claim_and_generate(job);

        match &result {
            Ok(GenerationOutcome::Generated { url }) => info!(url = %url, "pdf generated"),
            Ok(GenerationOutcome::StillDirty { url }) => {
                info!(url = %url, "pdf generated; document changed meanwhile")
            }
            Ok(GenerationOutcome::AlreadyClean) => debug!("document already clean"),
            Err(e @ GenerationError::RepositoryWrite { url, .. }) => error!(
                stage = e.stage().as_str(),
                url = %url,
                error = %e,
                "pdf stored but document could not be marked clean"
            ),
            Err(e @ GenerationError::LeaseLost { .. }) => {
                warn!(stage = e.stage().as_str(), error = %e, "stopping job without a live lease")
            }
            Err(e) => warn!(stage = e.stage().as_str(), error = %e, "pdf generation failed"),
        }

        result
    }

    fn claim_and_generate(&self, job: &GenerationJob) -> Result<GenerationOutcome, GenerationError> {
        // Started: of several deliveries of one job, only the first claim wins.
        let lease = self
            .locks
            .claim(&job.lock, self.lease_ttl)
            .map_err(GenerationError::Lock)?
            .ok_or_else(|| GenerationError::LeaseLost {
                lock_key: job.lock.key.as_string(),
                stage: GenerationStage::Started,
            })?;
        let guard = LockGuard::new(&self.locks, lease);

        let result = self.generate(job, &guard);

        if let Err(e) = guard.release() {
            // The lease still expires on its own.
            warn!(lock_key = %job.lock.key, error = %e, "failed to release lock");
        }
        result
    }

    fn ensure_lease(
        &self,
        job: &GenerationJob,
        guard: &LockGuard<'_, L>,
        stage: GenerationStage,
    ) -> Result<(), GenerationError> {
        if guard.is_live().map_err(GenerationError::Lock)? {
            Ok(())
        } else {
            Err(GenerationError::LeaseLost {
                lock_key: job.lock.key.as_string(),
                stage,
            })
        }
    }

    fn generate(
        &self,
        job: &GenerationJob,
        guard: &LockGuard<'_, L>,
    ) -> Result<GenerationOutcome, GenerationError> {
        let (kind, id) = (job.kind, job.document_id);

        // Rechecked
        if !self
            .repository
            .is_dirty(kind, id)
            .map_err(GenerationError::RepositoryRead)?
        {
            return Ok(GenerationOutcome::AlreadyClean);
        }
        let document = self
            .repository
            .load(kind, id)
            .map_err(GenerationError::RepositoryRead)?
            .ok_or(GenerationError::NotFound { kind, id })?;
        let observed = document.pdf().map(|p| p.dirty_count()).unwrap_or(0);
        if observed == 0 {
            return Ok(GenerationOutcome::AlreadyClean);
        }

        // Rendered
        let bytes = self
            .renderer
            .render(&document)
            .map_err(|source| GenerationError::Render { kind, id, source })?;

        // Stored
        self.ensure_lease(job, guard, GenerationStage::Rendered)?;
        let url = self
            .storage
            .store(&kind.upload_path(&id), &bytes)
            .map_err(|source| GenerationError::Storage { kind, id, source })?;

        // Cleaned
        self.ensure_lease(job, guard, GenerationStage::Stored)?;
        match self.repository.mark_clean(kind, id, &url, observed) {
            Ok(CleanOutcome::Clean) => Ok(GenerationOutcome::Generated { url }),
            Ok(CleanOutcome::StillDirty) => Ok(GenerationOutcome::StillDirty { url }),
            Err(source) => Err(GenerationError::RepositoryWrite {
                kind,
                id,
                url,
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::Utc;
    use docforge_core::Aggregate;
    use docforge_documents::{Document, DocumentCommand, DocumentLine, IssueDocument};

    use super::*;
    use crate::lock::{InMemoryLockManager, LockKey};
    use crate::render::TextRenderer;
    use crate::repository::InMemoryDocumentRepository;
    use crate::storage::InMemoryStorage;

    struct CountingRenderer {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingRenderer {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }
    }

    impl Renderer for CountingRenderer {
        fn render(&self, document: &Document) -> Result<Vec<u8>, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RenderError::Template("boom".to_string()));
            }
            TextRenderer.render(document)
        }
    }

    /// Repository whose `mark_clean` always fails.
    struct ReadOnlyRepository(Arc<InMemoryDocumentRepository>);

    impl DocumentRepository for ReadOnlyRepository {
        fn find_stale(&self, kind: DocumentKind) -> Result<Vec<DocumentId>, RepositoryError> {
            self.0.find_stale(kind)
        }
        fn is_dirty(&self, kind: DocumentKind, id: DocumentId) -> Result<bool, RepositoryError> {
            self.0.is_dirty(kind, id)
        }
        fn load(
            &self,
            kind: DocumentKind,
            id: DocumentId,
        ) -> Result<Option<Document>, RepositoryError> {
            self.0.load(kind, id)
        }
        fn mark_clean(
            &self,
            _: DocumentKind,
            _: DocumentId,
            _: &str,
            _: u32,
        ) -> Result<CleanOutcome, RepositoryError> {
            Err(RepositoryError::Backend("read-only replica".to_string()))
        }
        fn save(&self, document: &Document) -> Result<(), RepositoryError> {
            self.0.save(document)
        }
        fn mark_dirty(
            &self,
            kind: DocumentKind,
            id: DocumentId,
            upload_path: &str,
        ) -> Result<(), RepositoryError> {
            self.0.mark_dirty(kind, id, upload_path)
        }
        fn save_and_invalidate(
            &self,
            document: &Document,
            invalidations: u32,
        ) -> Result<(), RepositoryError> {
            self.0.save_and_invalidate(document, invalidations)
        }
    }

    const TTL: Duration = Duration::from_secs(30);

    fn issued_invoice(repo: &InMemoryDocumentRepository) -> DocumentId {
        let id = DocumentId::new();
        let mut doc = Document::draft(
            id,
            DocumentKind::Invoice,
            "ACME",
            "EUR",
            vec![DocumentLine {
                description: "Consulting".to_string(),
                quantity: 2,
                unit_price: 10_000,
            }],
        )
        .unwrap();
        let events = doc
            .handle(&DocumentCommand::Issue(IssueDocument {
                number: 7,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        doc.apply(&events[0]);
        repo.save(&doc).unwrap();
        repo.mark_dirty(DocumentKind::Invoice, id, &doc.upload_path())
            .unwrap();
        id
    }

    fn job_for(locks: &InMemoryLockManager, id: DocumentId) -> GenerationJob {
        let key = LockKey::new("t", DocumentKind::Invoice, id);
        let handle = locks.try_acquire(&key, TTL).unwrap().unwrap();
        GenerationJob::new(DocumentKind::Invoice, id, handle)
    }

    #[test]
    fn successful_run_cleans_and_releases() {
        let repo = Arc::new(InMemoryDocumentRepository::new());
        let locks = Arc::new(InMemoryLockManager::new());
        let storage = Arc::new(InMemoryStorage::new("/media/"));
        let worker = GenerationWorker::new(repo.clone(), locks.clone(), TextRenderer, storage.clone());
        let id = issued_invoice(&repo);

        let outcome = worker.run(&job_for(&locks, id)).unwrap();

        let path = DocumentKind::Invoice.upload_path(&id);
        assert_eq!(
            outcome,
            GenerationOutcome::Generated {
                url: format!("/media/{path}")
            }
        );
        assert!(!repo.is_dirty(DocumentKind::Invoice, id).unwrap());
        let pdf = repo.load(DocumentKind::Invoice, id).unwrap().unwrap();
        assert_eq!(pdf.pdf().unwrap().url(), Some(format!("/media/{path}").as_str()));
        assert!(storage.get(&path).is_some());
        assert_eq!(locks.held_count(), 0);
    }

    #[test]
    fn render_failure_leaves_document_dirty_and_releases() {
        let repo = Arc::new(InMemoryDocumentRepository::new());
        let locks = Arc::new(InMemoryLockManager::new());
        let storage = Arc::new(InMemoryStorage::default());
        let renderer = Arc::new(CountingRenderer::failing());
        let worker = GenerationWorker::new(repo.clone(), locks.clone(), renderer.clone(), storage.clone());
        let id = issued_invoice(&repo);

        let err = worker.run(&job_for(&locks, id)).unwrap_err();

        assert!(matches!(err, GenerationError::Render { .. }));
        assert_eq!(err.stage(), GenerationStage::Rechecked);
        assert!(repo.is_dirty(DocumentKind::Invoice, id).unwrap());
        let doc = repo.load(DocumentKind::Invoice, id).unwrap().unwrap();
        assert_eq!(doc.pdf().unwrap().url(), None);
        assert_eq!(storage.write_count(), 0);
        assert_eq!(locks.held_count(), 0);
        assert_eq!(repo.find_stale(DocumentKind::Invoice).unwrap(), vec![id]);
    }

    #[test]
    fn already_clean_document_is_a_no_op() {
        let repo = Arc::new(InMemoryDocumentRepository::new());
        let locks = Arc::new(InMemoryLockManager::new());
        let renderer = Arc::new(CountingRenderer::ok());
        let worker = GenerationWorker::new(
            repo.clone(),
            locks.clone(),
            renderer.clone(),
            InMemoryStorage::default(),
        );
        let id = issued_invoice(&repo);

        assert!(matches!(
            worker.run(&job_for(&locks, id)).unwrap(),
            GenerationOutcome::Generated { .. }
        ));
        // Duplicate delivery of an equivalent job after completion.
        assert_eq!(
            worker.run(&job_for(&locks, id)).unwrap(),
            GenerationOutcome::AlreadyClean
        );
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(locks.held_count(), 0);
    }

    #[test]
    fn job_without_live_lease_is_refused() {
        let repo = Arc::new(InMemoryDocumentRepository::new());
        let locks = Arc::new(InMemoryLockManager::new());
        let renderer = Arc::new(CountingRenderer::ok());
        let worker = GenerationWorker::new(
            repo.clone(),
            locks.clone(),
            renderer.clone(),
            InMemoryStorage::default(),
        );
        let id = issued_invoice(&repo);
        let job = job_for(&locks, id);
        locks.release(&job.lock).unwrap();
        // Someone else now owns the key.
        let key = LockKey::new("t", DocumentKind::Invoice, id);
        let other = locks.try_acquire(&key, TTL).unwrap().unwrap();

        let err = worker.run(&job).unwrap_err();

        assert!(matches!(err, GenerationError::LeaseLost { .. }));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
        assert!(locks.is_held(&other).unwrap());
        assert!(repo.is_dirty(DocumentKind::Invoice, id).unwrap());
    }

    #[test]
    fn concurrent_duplicate_deliveries_render_once() {
        struct SlowRenderer(CountingRenderer);

        impl Renderer for SlowRenderer {
            fn render(&self, document: &Document) -> Result<Vec<u8>, RenderError> {
                std::thread::sleep(Duration::from_millis(50));
                self.0.render(document)
            }
        }

        let repo = Arc::new(InMemoryDocumentRepository::new());
        let locks = Arc::new(InMemoryLockManager::new());
        let storage = Arc::new(InMemoryStorage::default());
        let renderer = Arc::new(SlowRenderer(CountingRenderer::ok()));
        let worker = Arc::new(GenerationWorker::new(
            repo.clone(),
            locks.clone(),
            renderer.clone(),
            storage.clone(),
        ));
        let id = issued_invoice(&repo);
        let job = job_for(&locks, id);

        let runs: Vec<_> = (0..4)
            .map(|_| {
                let (worker, job) = (worker.clone(), job.clone());
                std::thread::spawn(move || worker.run(&job))
            })
            .collect();
        let results: Vec<_> = runs.into_iter().map(|t| t.join().unwrap()).collect();

        let generated = results
            .iter()
            .filter(|r| matches!(r, Ok(GenerationOutcome::Generated { .. })))
            .count();
        let refused = results
            .iter()
            .filter(|r| matches!(r, Err(GenerationError::LeaseLost { .. })))
            .count();
        assert_eq!((generated, refused), (1, 3));
        assert_eq!(renderer.0.calls.load(Ordering::SeqCst), 1);
        assert_eq!(storage.write_count(), 1);
        assert!(!repo.is_dirty(DocumentKind::Invoice, id).unwrap());
        assert_eq!(locks.held_count(), 0);
    }

    #[test]
    fn redelivery_after_completion_is_refused() {
        let repo = Arc::new(InMemoryDocumentRepository::new());
        let locks = Arc::new(InMemoryLockManager::new());
        let renderer = Arc::new(CountingRenderer::ok());
        let worker = GenerationWorker::new(
            repo.clone(),
            locks.clone(),
            renderer.clone(),
            InMemoryStorage::default(),
        );
        let id = issued_invoice(&repo);
        let job = job_for(&locks, id);

        worker.run(&job).unwrap();
        let err = worker.run(&job).unwrap_err();

        assert!(matches!(err, GenerationError::LeaseLost { .. }));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn repository_write_failure_is_reported_and_lock_released() {
        let inner = Arc::new(InMemoryDocumentRepository::new());
        let locks = Arc::new(InMemoryLockManager::new());
        let storage = Arc::new(InMemoryStorage::default());
        let worker = GenerationWorker::new(
            ReadOnlyRepository(inner.clone()),
            locks.clone(),
            TextRenderer,
            storage.clone(),
        );
        let id = issued_invoice(&inner);

        let err = worker.run(&job_for(&locks, id)).unwrap_err();

        match &err {
            GenerationError::RepositoryWrite { url, .. } => {
                assert!(url.ends_with(&DocumentKind::Invoice.upload_path(&id)))
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.stage(), GenerationStage::Stored);
        assert_eq!(storage.write_count(), 1);
        assert!(inner.is_dirty(DocumentKind::Invoice, id).unwrap());
        assert_eq!(locks.held_count(), 0);
    }

    #[test]
    fn document_dirtied_during_render_stays_dirty() {
        struct DirtyingRenderer {
            repo: Arc<InMemoryDocumentRepository>,
        }

        impl Renderer for DirtyingRenderer {
            fn render(&self, document: &Document) -> Result<Vec<u8>, RenderError> {
                self.repo
                    .mark_dirty(document.kind(), document.id_typed(), &document.upload_path())
                    .map_err(|e| RenderError::Template(e.to_string()))?;
                TextRenderer.render(document)
            }
        }

        let repo = Arc::new(InMemoryDocumentRepository::new());
        let locks = Arc::new(InMemoryLockManager::new());
        let worker = GenerationWorker::new(
            repo.clone(),
            locks.clone(),
            DirtyingRenderer { repo: repo.clone() },
            InMemoryStorage::default(),
        );
        let id = issued_invoice(&repo);

        let outcome = worker.run(&job_for(&locks, id)).unwrap();

        assert!(matches!(outcome, GenerationOutcome::StillDirty { .. }));
        assert!(repo.is_dirty(DocumentKind::Invoice, id).unwrap());
        let doc = repo.load(DocumentKind::Invoice, id).unwrap().unwrap();
        assert!(doc.pdf().unwrap().url().is_some());
    }

    /// Returns fixed bytes after an optional delay.
    struct FixedRenderer {
        bytes: &'static [u8],
        delay: Duration,
    }

    impl Renderer for FixedRenderer {
        fn render(&self, _: &Document) -> Result<Vec<u8>, RenderError> {
            std::thread::sleep(self.delay);
            Ok(self.bytes.to_vec())
        }
    }

    #[test]
    fn expired_lease_never_overwrites_a_newer_artifact() {
        let repo = Arc::new(InMemoryDocumentRepository::new());
        let locks = Arc::new(InMemoryLockManager::new());
        let storage = Arc::new(InMemoryStorage::new("/media/"));
        let short = Duration::from_millis(50);
        let slow = GenerationWorker::new(
            repo.clone(),
            locks.clone(),
            FixedRenderer {
                bytes: b"stale-v1",
                delay: Duration::from_millis(250),
            },
            storage.clone(),
        )
        .with_lease_ttl(short);
        let fast = GenerationWorker::new(
            repo.clone(),
            locks.clone(),
            FixedRenderer {
                bytes: b"fresh-v2",
                delay: Duration::ZERO,
            },
            storage.clone(),
        );
        let id = issued_invoice(&repo);
        let key = LockKey::new("t", DocumentKind::Invoice, id);
        let first_job = GenerationJob::new(
            DocumentKind::Invoice,
            id,
            locks.try_acquire(&key, short).unwrap().unwrap(),
        );

        let slow_run = std::thread::spawn(move || slow.run(&first_job));
        std::thread::sleep(Duration::from_millis(120));
        // Content changes after the slow worker's lease ran out; a new owner
        // takes the key and regenerates.
        repo.mark_dirty(DocumentKind::Invoice, id, &DocumentKind::Invoice.upload_path(&id))
            .unwrap();
        let second_job = GenerationJob::new(
            DocumentKind::Invoice,
            id,
            locks.try_acquire(&key, TTL).unwrap().unwrap(),
        );
        assert!(matches!(
            fast.run(&second_job).unwrap(),
            GenerationOutcome::Generated { .. }
        ));

        let err = slow_run.join().unwrap().unwrap_err();

        assert!(matches!(err, GenerationError::LeaseLost { .. }));
        assert_eq!(err.stage(), GenerationStage::Rendered);
        let path = DocumentKind::Invoice.upload_path(&id);
        assert_eq!(storage.get(&path).unwrap(), b"fresh-v2".to_vec());
        assert_eq!(storage.write_count(), 1);
        assert!(!repo.is_dirty(DocumentKind::Invoice, id).unwrap());
        assert_eq!(locks.held_count(), 0);
    }

    #[test]
    fn lease_expiring_during_store_leaves_document_dirty() {
        struct SlowStorage(InMemoryStorage);

        impl ArtifactStorage for SlowStorage {
            fn store(&self, path: &str, bytes: &[u8]) -> Result<String, StorageError> {
                std::thread::sleep(Duration::from_millis(80));
                self.0.store(path, bytes)
            }
        }

        let repo = Arc::new(InMemoryDocumentRepository::new());
        let locks = Arc::new(InMemoryLockManager::new());
        let worker = GenerationWorker::new(
            repo.clone(),
            locks.clone(),
            TextRenderer,
            SlowStorage(InMemoryStorage::default()),
        )
        .with_lease_ttl(Duration::from_millis(30));
        let id = issued_invoice(&repo);

        let err = worker.run(&job_for(&locks, id)).unwrap_err();

        assert!(matches!(err, GenerationError::LeaseLost { .. }));
        assert_eq!(err.stage(), GenerationStage::Stored);
        assert!(repo.is_dirty(DocumentKind::Invoice, id).unwrap());
        assert_eq!(repo.find_stale(DocumentKind::Invoice).unwrap(), vec![id]);
    }

    #[test]
    fn unknown_document_reads_as_clean() {
        let repo = Arc::new(InMemoryDocumentRepository::new());
        let locks = Arc::new(InMemoryLockManager::new());
        let worker = GenerationWorker::new(
            repo.clone(),
            locks.clone(),
            TextRenderer,
            InMemoryStorage::default(),
        );

        // No record at all reads as clean.
        let outcome = worker.run(&job_for(&locks, DocumentId::new())).unwrap();
        assert_eq!(outcome, GenerationOutcome::AlreadyClean);
        assert_eq!(locks.held_count(), 0);
    }
}
