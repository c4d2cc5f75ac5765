//! Tracing setup.
//!
//! Logs go to stderr so that `replay` can keep stdout for events. `RUST_LOG`
//! always wins; otherwise only warnings and errors are shown, and `--debug`
//! turns on debug output for both crates.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

fn default_filter(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::new("settings_relay=debug,settings_relay_core=debug,warn")
    } else {
        EnvFilter::new("warn")
    }
}

pub fn init(debug: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(debug));

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()
    };

    if let Err(e) = res {
        eprintln!("tracing already initialized: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_by_default() {
        assert_eq!(default_filter(false).to_string(), "warn");
    }

    #[test]
    fn debug_targets_both_crates() {
        let filter = default_filter(true).to_string();
        assert!(filter.contains("settings_relay=debug"));
        assert!(filter.contains("settings_relay_core=debug"));
    }
}
