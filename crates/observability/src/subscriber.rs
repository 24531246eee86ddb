//! Tracing subscriber initialization.

use tracing_subscriber::EnvFilter;

/// Crates whose events are kept when `RUST_LOG` is unset.
const LOTSPLIT_TARGETS: &[&str] = &[
    "lotsplit_core",
    "lotsplit_inventory",
    "lotsplit_shipping",
    "lotsplit_infra",
];

/// `fallback` for everything, `level` for the lotsplit crates.
fn default_directives(fallback: &str, level: &str) -> String {
    std::iter::once(fallback.to_owned())
        .chain(LOTSPLIT_TARGETS.iter().map(|target| format!("{target}={level}")))
        .collect::<Vec<_>>()
        .join(",")
}

fn filter(fallback: &str, level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(fallback, level)))
}

/// JSON logs with timestamps and targets, filtered by `RUST_LOG`.
///
/// Without `RUST_LOG`, the lotsplit crates log at `info` and dependencies at `warn`.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("warn", "info"))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(true)
        .try_init();
}

/// Human-readable debug output of the lotsplit crates, routed through the test writer.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("warn", "debug"))
        .with_test_writer()
        .try_init();
}
