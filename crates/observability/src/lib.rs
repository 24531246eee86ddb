//! Tracing/logging setup shared by binaries and tests.

/// Subscriber configuration (filters, formatters).
pub mod subscriber;

/// Initialize process-wide logging.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    subscriber::init();
}

/// Initialize logging for tests: debug level, captured by the test harness.
pub fn init_test() {
    subscriber::init_test();
}
