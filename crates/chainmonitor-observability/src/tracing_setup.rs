//! Tracing / logging initialisation helpers.

use chainmonitor_core::LogConfig;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

/// Filter directives for a log config: `"info,chainmonitor_storage=debug"`.
///
/// Component names may use dashes; they are mapped to crate-path underscores.
pub fn build_directives(config: &LogConfig) -> String {
    let mut components: Vec<_> = config.components.iter().collect();
    components.sort();

    let mut directives = config.level.clone();
    for (component, level) in components {
        directives.push_str(&format!(",{}={}", component.replace('-', "_"), level));
    }
    directives
}

/// Initialise tracing with the given log config. Logs go to stderr.
/// Should be called once at application startup; a second call fails.
pub fn init_tracing(config: &LogConfig) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_new(build_directives(config)).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    }
}
