//! Tracing setup for applications embedding the crate.
//!
//! The library itself only emits `tracing` events; nothing is printed unless
//! the host installs a subscriber, either its own or the one from [`init`].

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Directive applied when `RUST_LOG` does not mention this crate.
pub const DEFAULT_DIRECTIVE: &str = "music_dedupe=info";

fn env_filter() -> EnvFilter {
    let filter = EnvFilter::from_default_env();
    match DEFAULT_DIRECTIVE.parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Install a formatted subscriber filtered by `RUST_LOG`.
///
/// Returns `false` if a global subscriber was already set, in which case
/// the existing one is left alone.
pub fn init() -> bool {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(env_filter())
        .try_init()
        .is_ok()
}
