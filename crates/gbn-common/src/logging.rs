//! Tracing bootstrap shared by all three binaries.

use tracing_subscriber::EnvFilter;

/// Install a `tracing_subscriber::fmt` subscriber. Honors `RUST_LOG` if
/// set; otherwise defaults to `info`, or `debug` when `verbose` is set.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .init();
}
