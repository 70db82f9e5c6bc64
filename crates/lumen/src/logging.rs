//! Logging initialization.
//!
//! Logs go to stderr so stdout stays machine-readable for `lumen run`.
//! `RUST_LOG` overrides the level resolved here.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber with the given default filter.
pub fn init(default_directive: &str, json_format: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize from the `[logging]` section; `--verbose` and `--json-logs`
/// win over the file.
pub fn init_from_config(config: &lumen_core::Config, verbose: bool, json_logs: bool) {
    let json_format = json_logs || config.logging.format == "json";
    init(default_level(&config.logging.level, verbose), json_format);
}

/// `--verbose` raises the level to at least debug but never lowers `trace`.
fn default_level(configured: &str, verbose: bool) -> &str {
    match (verbose, configured) {
        (_, "trace") => "trace",
        (true, _) => "debug",
        (false, level) => level,
    }
}
