//! Tracing init and panic hook, trimmed from `iepathos-debtmap`'s
//! `observability` module: this analyzer is explicitly single-threaded (spec
//! §5), so the TUI-suppression and multi-thread panic-capture machinery the
//! teacher carries has no counterpart here.

mod panic_hook;
mod tracing_init;

pub use panic_hook::install_panic_hook;
pub use tracing_init::init_tracing;
