//! Logging setup and configuration

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Setup tracing subscriber for the application
///
/// `RUST_LOG` takes precedence over `default_level`. With `debug_trace` set,
/// debug events are enabled whatever either of them says. Output goes to
/// stderr so that measurement output on stdout stays machine readable.
pub fn setup_logging(default_level: &str, debug_trace: bool) -> crate::Result<()> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(env.as_deref(), default_level, debug_trace)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .map_err(|e| crate::Error::Config(format!("Logging already initialized: {}", e)))?;

    tracing::debug!("Logging initialized (default level {})", default_level);
    Ok(())
}

/// Filter from an optional `RUST_LOG` value and the fallback level
///
/// An empty or unparsable `env` falls back to `default_level`.
pub fn build_filter(
    env: Option<&str>,
    default_level: &str,
    debug_trace: bool,
) -> crate::Result<EnvFilter> {
    let filter = match env.filter(|s| !s.trim().is_empty()).map(EnvFilter::try_new) {
        Some(Ok(filter)) => filter,
        _ => EnvFilter::try_new(default_level)
            .map_err(|e| crate::Error::Config(format!("Invalid log filter: {}", e)))?,
    };

    Ok(if debug_trace {
        filter.add_directive(LevelFilter::DEBUG.into())
    } else {
        filter
    })
}
