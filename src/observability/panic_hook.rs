//! Structured panic reports, trimmed from `iepathos-debtmap/src/observability/
//! panic_hook.rs`: no TUI to exit, no cross-thread panic capture to retrieve
//! (spec §5: single-threaded), just a crash message pointing at the file
//! under analysis.

use std::panic::PanicHookInfo;

/// Installs a panic hook that prints the panic message and location plainly,
/// without the default hook's backtrace-hint boilerplate. Call once, before
/// any analysis begins.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info: &PanicHookInfo| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown location".to_string());
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        eprintln!("analyzer crashed: {message} at {location}");
    }));
}
