//! `tracing` subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG`, `-v`, nor `[logging] level` is set.
pub const DEFAULT_FILTER: &str = "warn,adsight=info";

/// Pick the filter directive from verbosity and the configured level.
///
/// `-v` wins over the config file; `-vv` and beyond enable trace output.
pub fn filter_directive(verbose: u8, configured: Option<&str>) -> String {
    match (verbose, configured) {
        (0, Some(level)) => level.to_string(),
        (0, None) => DEFAULT_FILTER.to_string(),
        (1, _) => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber, writing to stderr. `RUST_LOG` overrides.
pub fn init(verbose: u8, configured: Option<&str>) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter_directive(verbose, configured).into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
