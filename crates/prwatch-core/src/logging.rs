//! Structured logging setup.
//!
//! Every log line is JSON with an `event` field naming what happened
//! (`core.scheduler.tick_skipped`, `cli.watch.started`, ...). `RUST_LOG`
//! overrides the default filter.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Install the global JSON subscriber. Quiet mode only lets warnings through.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(quiet: bool) {
    let default_directive = if quiet { "warn" } else { "prwatch=info,prwatch_core=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
}
