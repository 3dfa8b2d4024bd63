//! Logging bootstrap.
//!
//! Library code only emits `tracing` events; tests route them through the
//! harness output by installing a subscriber here.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a fmt subscriber writing through the test harness. `RUST_LOG`
/// overrides the `warn` default; an already installed subscriber is kept.
pub fn try_init_for_tests() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
}
