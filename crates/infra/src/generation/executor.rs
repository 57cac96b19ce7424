//! Worker pool pulling generation jobs from a [`JobSource`].

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::job::GenerationJob;
use super::queue::{JobSource, QueueError};
use super::worker::{GenerationError, GenerationOutcome, GenerationWorker};
use crate::lock::LockManager;
use crate::render::Renderer;
use crate::repository::DocumentRepository;
use crate::storage::ArtifactStorage;

/// Anything that can execute a generation job.
pub trait JobHandler: Send + Sync {
    fn handle(&self, job: &GenerationJob) -> Result<GenerationOutcome, GenerationError>;
}

impl<F> JobHandler for F
where
    F: Fn(&GenerationJob) -> Result<GenerationOutcome, GenerationError> + Send + Sync,
{
    fn handle(&self, job: &GenerationJob) -> Result<GenerationOutcome, GenerationError> {
        self(job)
    }
}

impl<R, L, Rn, S> JobHandler for GenerationWorker<R, L, Rn, S>
where
    R: DocumentRepository,
    L: LockManager,
    Rn: Renderer,
    S: ArtifactStorage,
{
    fn handle(&self, job: &GenerationJob) -> Result<GenerationOutcome, GenerationError> {
        self.run(job)
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// How long a thread waits on the source before re-checking for shutdown.
    pub poll_interval: Duration,
    /// Thread name prefix, also used in logs.
    pub name: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            poll_interval: Duration::from_millis(250),
            name: "pdf-worker".to_string(),
        }
    }
}

impl ExecutorConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Executor runtime statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ExecutorStats {
    pub jobs_processed: u64,
    pub jobs_generated: u64,
    pub jobs_already_clean: u64,
    pub jobs_failed: u64,
    pub jobs_panicked: u64,
    pub uptime_secs: u64,
}

/// Handle to control a running executor.
#[derive(Debug)]
pub struct ExecutorHandle {
    shutdown: Arc<AtomicBool>,
    joins: Vec<thread::JoinHandle<()>>,
    stats: Arc<Mutex<ExecutorStats>>,
    started: Instant,
}

impl ExecutorHandle {
    /// Stop taking new jobs, let in-flight jobs finish, and join every thread.
    pub fn shutdown(mut self) -> ExecutorStats {
        self.shutdown.store(true, Ordering::SeqCst);
        for join in self.joins.drain(..) {
            if join.join().is_err() {
                error!("pdf worker thread terminated abnormally");
            }
        }
        self.stats()
    }

    /// Get current executor statistics.
    pub fn stats(&self) -> ExecutorStats {
        let mut stats = self.stats.lock().map(|s| s.clone()).unwrap_or_default();
        stats.uptime_secs = self.started.elapsed().as_secs();
        stats
    }
}

impl Drop for ExecutorHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

/// Multi-threaded generation executor.
pub struct GenerationExecutor;

impl GenerationExecutor {
    /// Spawn `config.workers` threads, each pulling from `source` and running
    /// jobs on `handler`.
    pub fn spawn<H, S>(
        handler: Arc<H>,
        source: Arc<S>,
        config: ExecutorConfig,
    ) -> std::io::Result<ExecutorHandle>
    where
        H: JobHandler + ?Sized + 'static,
        S: JobSource + ?Sized + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(Mutex::new(ExecutorStats::default()));
        let mut handle = ExecutorHandle {
            shutdown: shutdown.clone(),
            joins: Vec::with_capacity(config.workers),
            stats: stats.clone(),
            started: Instant::now(),
        };

        for n in 0..config.workers.max(1) {
            let thread_name = format!("{}-{}", config.name, n);
            let (handler, source, shutdown, stats) =
                (handler.clone(), source.clone(), shutdown.clone(), stats.clone());
            let poll_interval = config.poll_interval;
            let name = thread_name.clone();

            let join = thread::Builder::new()
                .name(thread_name)
                .spawn(move || {
                    worker_loop(&name, &*handler, &*source, poll_interval, &shutdown, &stats)
                });

            match join {
                Ok(join) => handle.joins.push(join),
                Err(e) => {
                    // Stop whatever already started before reporting.
                    handle.shutdown();
                    return Err(e);
                }
            }
        }

        info!(executor = %config.name, workers = config.workers.max(1), "pdf executor started");
        Ok(handle)
    }
}

fn record(stats: &Mutex<ExecutorStats>, f: impl FnOnce(&mut ExecutorStats)) {
    if let Ok(mut s) = stats.lock() {
        s.jobs_processed += 1;
        f(&mut s);
    }
}

fn worker_loop<H, S>(
    name: &str,
    handler: &H,
    source: &S,
    poll_interval: Duration,
    shutdown: &AtomicBool,
    stats: &Mutex<ExecutorStats>,
) where
    H: JobHandler + ?Sized,
    S: JobSource + ?Sized,
{
    debug!(worker = name, "pdf worker started");

    while !shutdown.load(Ordering::SeqCst) {
        let job = match source.next_job(poll_interval) {
            Ok(Some(job)) => job,
            Ok(None) => continue,
            Err(QueueError::Closed) => {
                debug!(worker = name, "job source closed");
                break;
            }
            Err(e) => {
                error!(worker = name, error = %e, "failed to receive job");
                thread::sleep(poll_interval);
                continue;
            }
        };

        debug!(worker = name, job_id = %job.job_id, kind = %job.kind, document_id = %job.document_id, "claimed job");

        match catch_unwind(AssertUnwindSafe(|| handler.handle(&job))) {
            Ok(Ok(GenerationOutcome::AlreadyClean)) => record(stats, |s| s.jobs_already_clean += 1),
            Ok(Ok(_)) => record(stats, |s| s.jobs_generated += 1),
            Ok(Err(_)) => record(stats, |s| s.jobs_failed += 1),
            Err(_) => {
                error!(
                    worker = name,
                    job_id = %job.job_id,
                    kind = %job.kind,
                    document_id = %job.document_id,
                    "pdf job panicked"
                );
                record(stats, |s| s.jobs_panicked += 1);
            }
        }
    }

    if shutdown.load(Ordering::SeqCst) {
        debug!(worker = name, "pdf worker stopped");
    } else {
        warn!(worker = name, "pdf worker exiting without shutdown request");
    }
}
