//! Infrastructure layer for PDF generation: locks, repositories, rendering,
//! storage, the job queue, the dispatch loop and the worker pool.

pub mod config;
pub mod generation;
pub mod lifecycle;
pub mod lock;
pub mod render;
pub mod repository;
pub mod storage;


pub use config::{ConfigError, GeneratorConfig};
pub use lifecycle::{DocumentService, LifecycleError};
