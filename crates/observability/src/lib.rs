//! Tracing/logging setup shared by the portalgate binaries.

/// Initialize process-wide tracing with the default `info` filter.
///
/// Later calls are no-ops.
pub fn init() {
    tracing::init();
}

pub use self::tracing::init_with_default;

/// Subscriber construction (JSON formatter, `RUST_LOG` filter).
pub mod tracing;
