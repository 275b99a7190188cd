//! Tracing bootstrap for hosts embedding the crate.

use tracing_subscriber::EnvFilter;

/// Install a formatted subscriber with env-filter support.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("relaybot=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
