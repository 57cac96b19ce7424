//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

use crate::LogFormat;

/// Install the global subscriber, filtered by `RUST_LOG` (default `info`).
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    let _ = match format {
        // JSON logs + timestamps; span fields carry job/document context.
        LogFormat::Json => builder
            .json()
            .with_current_span(true)
            .with_target(false)
            .try_init(),
        LogFormat::Pretty => builder.with_thread_names(true).try_init(),
    };
}
