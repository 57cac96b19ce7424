//! Dispatch loop: triage stale documents into generation jobs.
//!
//! A sweep never renders or stores anything. For each supported kind it reads
//! the stale set, tries each document's lock once and enqueues a job for every
//! lock it wins. Held locks are skipped until the next sweep.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use docforge_core::DocumentId;
use docforge_documents::DocumentKind;

use crate::lock::{LockKey, LockManager};
use crate::repository::DocumentRepository;

use super::job::GenerationJob;
use super::queue::JobQueue;

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Prefix of every lock key.
    pub namespace: String,
    /// Lease given to each dispatched job.
    pub lock_ttl: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            namespace: "docforge".to_string(),
            lock_ttl: Duration::from_secs(300),
        }
    }
}

/// Counters for one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Stale documents found across all kinds.
    pub stale: usize,
    pub dispatched: usize,
    /// Documents whose lock was held by someone else.
    pub skipped_locked: usize,
    /// Documents skipped because of a lock backend or queue failure.
    pub failed: usize,
    /// Kinds whose stale query failed.
    pub failed_kinds: Vec<DocumentKind>,
}

pub struct Dispatcher<R, L, Q> {
    repository: R,
    locks: L,
    queue: Q,
    config: DispatchConfig,
}

impl<R, L, Q> Dispatcher<R, L, Q>
where
    R: DocumentRepository,
    L: LockManager,
    Q: JobQueue,
{
    pub fn new(repository: R, locks: L, queue: Q, config: DispatchConfig) -> Self {
        Self {
            repository,
            locks,
            queue,
            config,
        }
    }

    /// Run one sweep over every supported kind.
    #[instrument(skip(self), fields(namespace = %self.config.namespace))]
    pub fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();

        for kind in DocumentKind::ALL {
            let stale = match self.repository.find_stale(kind) {
                Ok(ids) => ids,
                Err(e) => {
                    error!(kind = %kind, error = %e, "stale query failed; skipping kind");
                    report.failed_kinds.push(kind);
                    continue;
                }
            };

            report.stale += stale.len();
            for id in stale {
                self.dispatch_one(kind, id, &mut report);
            }
        }

        if report.dispatched > 0 || report.failed > 0 || !report.failed_kinds.is_empty() {
            info!(
                stale = report.stale,
                dispatched = report.dispatched,
                skipped_locked = report.skipped_locked,
                failed = report.failed,
                "sweep finished"
            );
        } else {
            debug!(
                stale = report.stale,
                skipped_locked = report.skipped_locked,
                "sweep finished"
            );
        }

        report
    }

    fn dispatch_one(&self, kind: DocumentKind, id: DocumentId, report: &mut SweepReport) {
        let key = LockKey::new(self.config.namespace.clone(), kind, id);

        let handle = match self.locks.try_acquire(&key, self.config.lock_ttl) {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                debug!(lock_key = %key, "lock held; skipping");
                report.skipped_locked += 1;
                return;
            }
            Err(e) => {
                warn!(lock_key = %key, error = %e, "lock backend error; skipping");
                report.failed += 1;
                return;
            }
        };

        let job = GenerationJob::new(kind, id, handle.clone());
        let job_id = job.job_id;
        match self.queue.enqueue(job) {
            Ok(()) => {
                debug!(lock_key = %key, job_id = %job_id, "generation job enqueued");
                report.dispatched += 1;
            }
            Err(e) => {
                error!(lock_key = %key, error = %e, "enqueue failed; releasing lock");
                if let Err(release_err) = self.locks.release(&handle) {
                    warn!(lock_key = %key, error = %release_err, "failed to release lock");
                }
                report.failed += 1;
            }
        }
    }
}
