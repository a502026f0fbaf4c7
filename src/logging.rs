//! Process-wide logging.
//!
//! Everything logs through `tracing`. The binary installs a `fmt` subscriber
//! filtered by `RUST_LOG`, falling back to [`default_directives`], and a panic
//! hook so panics inside request handlers end up in the same log stream.

use crate::error::{Error, Result};
use std::any::Any;
use std::panic;
use tracing_subscriber::EnvFilter;

/// Filter directives used when `RUST_LOG` is unset.
#[must_use]
pub const fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "gantt_server=debug,tower_http=debug"
    } else {
        "gantt_server=info,tower_http=info"
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| Error::Config(format!("cannot install logger: {e}")))
}

/// Log a panic with its location and, if captured, a backtrace.
#[allow(deprecated)] // PanicInfo is deprecated but PanicHookInfo requires Rust 1.81+
fn log_panic(info: &panic::PanicInfo<'_>) {
    let location = format_panic_location(info.location());
    let message = panic_message(info.payload());

    let backtrace = std::backtrace::Backtrace::capture();
    if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
        tracing::error!(%location, %backtrace, "panic: {message}");
    } else {
        tracing::error!(%location, "panic: {message}");
    }
}

fn format_panic_location(location: Option<&panic::Location<'_>>) -> String {
    location.map_or_else(
        || "unknown".to_string(),
        |loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()),
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

/// Route panics through `tracing::error!`, then through the previous hook.
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        log_panic(info);
        original_hook(info);
    }));

    tracing::debug!("panic hook installed");
}
