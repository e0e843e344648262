//! Process-wide tracing setup for the CLI and embedding apps.
//!
//! The library itself only emits events (`beewallet::sync`, `beewallet::router`);
//! nothing is printed until a subscriber is installed here or by the host.

use tracing_subscriber::{fmt, EnvFilter};

const JSON_ENV: &str = "BEEWALLET_LOG_JSON";

/// Installs a stderr subscriber so stdout stays clean for JSON command output.
///
/// `RUST_LOG` picks the filter (default `info`, e.g. `beewallet::sync=debug`).
/// `BEEWALLET_LOG_JSON=1` emits one JSON object per event. A host that already
/// set a global subscriber keeps it; this call is then a no-op.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let use_json = std::env::var(JSON_ENV).map(|value| value == "1").unwrap_or(false);

    let builder = fmt::Subscriber::builder().with_env_filter(env_filter).with_writer(std::io::stderr);
    let _ = if use_json { builder.json().try_init() } else { builder.pretty().try_init() };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_noop() {
        init_logging();
        init_logging();
        tracing::info!(target: "beewallet::logging", "still logging");
    }
}
