//! Process-wide tracing and logging setup.

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing subscriber configuration (filters, output format).
pub mod tracing;

pub use tracing::LogFormat;
