//! Job queue boundary between the dispatcher and the worker pool.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use super::job::GenerationJob;

#[derive(Debug, Clone, thiserror::Error)]
pub enum QueueError {
    #[error("queue closed")]
    Closed,
    #[error("queue backend error: {0}")]
    Backend(String),
    #[error("queue state poisoned")]
    Poisoned,
}

/// Producer side. Fire-and-forget: returns once the job is accepted.
pub trait JobQueue: Send + Sync {
    fn enqueue(&self, job: GenerationJob) -> Result<(), QueueError>;
}

/// Consumer side.
pub trait JobSource: Send + Sync {
    /// Wait up to `timeout` for the next job. `Ok(None)` means nothing arrived.
    fn next_job(&self, timeout: Duration) -> Result<Option<GenerationJob>, QueueError>;
}

impl<Q> JobQueue for Arc<Q>
where
    Q: JobQueue + ?Sized,
{
    fn enqueue(&self, job: GenerationJob) -> Result<(), QueueError> {
        (**self).enqueue(job)
    }
}

impl<Q> JobSource for Arc<Q>
where
    Q: JobSource + ?Sized,
{
    fn next_job(&self, timeout: Duration) -> Result<Option<GenerationJob>, QueueError> {
        (**self).next_job(timeout)
    }
}

#[derive(Debug, Default)]
struct State {
    jobs: VecDeque<GenerationJob>,
    closed: bool,
}

/// In-process FIFO shared by any number of producers and consumers.
#[derive(Debug, Default)]
pub struct InMemoryJobQueue {
    state: Mutex<State>,
    available: Condvar,
    enqueued: AtomicU64,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.jobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Jobs accepted since creation.
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued.load(Ordering::SeqCst)
    }

    /// Take every pending job without waiting.
    pub fn drain(&self) -> Vec<GenerationJob> {
        self.state
            .lock()
            .map(|mut s| s.jobs.drain(..).collect())
            .unwrap_or_default()
    }

    /// Reject further jobs and wake all waiting consumers. Pending jobs can
    /// still be taken.
    pub fn close(&self) {
        if let Ok(mut s) = self.state.lock() {
            s.closed = true;
        }
        self.available.notify_all();
    }
}

impl JobQueue for InMemoryJobQueue {
    fn enqueue(&self, job: GenerationJob) -> Result<(), QueueError> {
        let mut state = self.state.lock().map_err(|_| QueueError::Poisoned)?;
        if state.closed {
            return Err(QueueError::Closed);
        }
        state.jobs.push_back(job);
        self.enqueued.fetch_add(1, Ordering::SeqCst);
        drop(state);
        self.available.notify_one();
        Ok(())
    }
}

impl JobSource for InMemoryJobQueue {
    fn next_job(&self, timeout: Duration) -> Result<Option<GenerationJob>, QueueError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().map_err(|_| QueueError::Poisoned)?;
        loop {
            if let Some(job) = state.jobs.pop_front() {
                return Ok(Some(job));
            }
            if state.closed {
                return Err(QueueError::Closed);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let (next, _) = self
                .available
                .wait_timeout(state, deadline - now)
                .map_err(|_| QueueError::Poisoned)?;
            state = next;
        }
    }
}
