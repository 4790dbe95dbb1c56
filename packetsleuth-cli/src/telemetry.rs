//! Logging setup

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter directive forced by `-v` flags, if any
fn verbosity_directive(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("debug"),
        _ => Some("trace"),
    }
}

/// Build the filter: `-v` flags win, then `RUST_LOG`, then `info`
pub fn filter(verbose: u8) -> EnvFilter {
    match verbosity_directive(verbose) {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Install the global subscriber
pub fn init(verbose: u8) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter(verbose))
        .init();
}
