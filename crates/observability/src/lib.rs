//! Process-wide tracing setup.

/// Log output format.
pub mod format;
/// Tracing subscriber installation (filters, layers).
pub mod tracing;

pub use format::LogFormat;

/// Initialize process-wide observability (tracing/logging).
///
/// The format comes from `DOCFORGE_LOG_FORMAT` (`json` by default, `pretty`
/// for local runs). Safe to call multiple times; later calls are no-ops.
pub fn init() {
    tracing::init(LogFormat::from_env());
}
