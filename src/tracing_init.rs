//! Tracing initialization for tests and binaries.
//!
//! Environment-based filtering via RUST_LOG:
//! - `RUST_LOG=chirploc=debug` - all debug output
//! - `RUST_LOG=chirploc::detector=trace` - trace one module
//! - `RUST_LOG=chirploc=info,chirploc::pipeline=debug` - mixed levels

#[cfg(test)]
use once_cell::sync::Lazy;

/// Initialize tracing for tests. Safe to call from every test; the
/// subscriber is installed once.
#[cfg(test)]
pub fn init_test_tracing() {
    static TRACING: Lazy<()> = Lazy::new(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("chirploc=warn"));

        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_line_number(true)
            .with_test_writer()
            .init();
    });

    Lazy::force(&TRACING);
}

/// Initialize tracing for binaries. Call early in main().
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("chirploc=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();
}
