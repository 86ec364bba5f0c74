//! Structured logging controlled by `RUST_LOG` (default `warn`), following
//! `iepathos-debtmap/src/observability/tracing.rs`'s log-level convention:
//! `info` for phase-level progress, `debug`/`trace` for per-node/per-iteration
//! detail, `warn` for recoverable analysis issues (spec §7).

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global tracing subscriber. Call once, early in `main`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
