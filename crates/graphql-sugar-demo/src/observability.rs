//! Log output for the demo server.
//!
//! The subscriber is installed before the config file is read, so it starts
//! at `info` (or `RUST_LOG`). Once `[logging]` is known,
//! [`apply_logging_level`] swaps the filter in place.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

const STARTUP_LEVEL: &str = "info";

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_tracing() {
    let directives = filter_directives(rust_log().as_deref(), STARTUP_LEVEL).to_owned();
    let (filter, handle) = reload::Layer::new(parse_filter(&directives));
    if FILTER_HANDLE.set(handle).is_err() {
        return;
    }

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}

/// Switches the running subscriber to the configured `level`.
///
/// Returns false when nothing changed: `RUST_LOG` is set and takes
/// precedence, or tracing was never initialised.
pub fn apply_logging_level(level: &str) -> bool {
    if rust_log().is_some() {
        return false;
    }
    let Some(handle) = FILTER_HANDLE.get() else {
        return false;
    };

    let applied = handle.modify(|filter| *filter = parse_filter(level)).is_ok();
    if applied {
        tracing::debug!(level, "Log level applied from configuration");
    }
    applied
}

fn rust_log() -> Option<String> {
    std::env::var("RUST_LOG").ok().filter(|v| !v.trim().is_empty())
}

/// `RUST_LOG` when present, otherwise the configured level.
fn filter_directives<'a>(rust_log: Option<&'a str>, level: &'a str) -> &'a str {
    rust_log.unwrap_or(level)
}

/// Unparseable directives fall back to the startup level.
fn parse_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(STARTUP_LEVEL))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_overrides_level() {
        assert_eq!(filter_directives(Some("graphql_sugar=trace"), "warn"), "graphql_sugar=trace");
        assert_eq!(filter_directives(None, "warn"), "warn");
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(parse_filter("debug").to_string(), "debug");
        assert_eq!(parse_filter("graphql_sugar=loud").to_string(), STARTUP_LEVEL);
    }
}
