//! PDF generation worker: wiring and the periodic sweep loop.

pub mod app;

pub use app::run::{run, run_until};
pub use app::services::{Services, build_services};
