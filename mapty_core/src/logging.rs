//! Tracing setup for the mapty binaries.
//!
//! Logs go to stderr so command output on stdout stays machine readable.
//! The filter comes from `MAPTY_LOG`, then `RUST_LOG`, then the given default.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable checked before `RUST_LOG`
pub const LOG_ENV: &str = "MAPTY_LOG";

/// Initialize logging at the `warn` level unless overridden
pub fn init() {
    init_with_level("warn")
}

/// Initialize logging with a specific default level
pub fn init_with_level(default_level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

/// Initialize logging for tests (captured by the test harness)
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
