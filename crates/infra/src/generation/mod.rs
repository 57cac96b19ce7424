//! PDF generation pipeline.
//!
//! ```text
//! Dispatcher::sweep ──try_acquire──▶ LockManager
//!        │
//!        └── enqueue(GenerationJob) ──▶ JobQueue ──▶ GenerationExecutor
//!                                                          │
//!                                             GenerationWorker::run
//!                                     recheck → render → store → mark_clean
//!                                                          │
//!                                                  LockGuard (release)
//! ```
//!
//! The queue is the only boundary between dispatch and generation. Delivery is
//! assumed at-least-once: the worker refuses jobs whose lease it no longer
//! owns and treats already clean documents as a no-op.

pub mod dispatcher;
pub mod executor;
pub mod job;
pub mod queue;
pub mod worker;

pub use dispatcher::{DispatchConfig, Dispatcher, SweepReport};
pub use executor::{ExecutorConfig, ExecutorHandle, ExecutorStats, GenerationExecutor, JobHandler};
pub use job::{GenerationJob, JobId};
pub use queue::{InMemoryJobQueue, JobQueue, JobSource, QueueError};
pub use worker::{GenerationError, GenerationOutcome, GenerationStage, GenerationWorker};
