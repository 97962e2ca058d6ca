//! Tracing setup. Call [`init_tracing`] once, near the start of a binary or
//! test, to get `RUST_LOG`-driven structured logs on stderr.

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber reading its filter from `RUST_LOG`
/// (defaulting to `info`). Safe to call more than once; later calls are
/// no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
