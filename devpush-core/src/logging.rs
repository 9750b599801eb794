//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Preferences;

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins over `default_filter`. Calling this more than once is a
/// no-op, so tests and embedding tools can both call it.
pub fn init_tracing(default_filter: &str) {
    let _ = fmt().with_env_filter(env_filter(default_filter)).with_target(false).try_init();
}

/// Same as [`init_tracing`] but emits newline-delimited JSON records.
pub fn init_json_tracing(default_filter: &str) {
    let _ = fmt()
        .json()
        .with_env_filter(env_filter(default_filter))
        .with_target(false)
        .try_init();
}

/// Install the subscriber described by `prefs.log_filter`.
///
/// With `machine_output` set, stdout carries execution events, so log
/// records go to stderr as JSON instead.
pub fn init_from_preferences(prefs: &Preferences) {
    if prefs.machine_output {
        let _ = fmt()
            .json()
            .with_env_filter(env_filter(&prefs.log_filter))
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    } else {
        init_tracing(&prefs.log_filter);
    }
}
