//! Tracing setup.
//!
//! Always logs to stderr. Debug mode also writes `jamfs.log` in the
//! temporary directory, since a daemonized mount has no terminal.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log file name used in debug mode.
pub const LOG_FILE: &str = "jamfs.log";

/// Default filter when `RUST_LOG` is unset.
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "jamfs=debug,jamfs_kernel=debug,warn"
    } else {
        "jamfs=info,jamfs_kernel=info,warn"
    }
}

/// Where the debug log goes.
pub fn log_path() -> PathBuf {
    std::env::temp_dir().join(LOG_FILE)
}

/// Install the global subscriber. Keep the guard alive until exit so the
/// file writer flushes.
pub fn init(debug: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(debug)));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr));

    if !debug {
        registry.init();
        return None;
    }

    let file_appender = tracing_appender::rolling::never(std::env::temp_dir(), LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    registry
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();
    tracing::info!("debug logging to {}", log_path().display());
    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert!(default_filter(true).contains("jamfs_kernel=debug"));
        assert!(default_filter(false).contains("jamfs_kernel=info"));
        assert!(EnvFilter::try_new(default_filter(true)).is_ok());
    }

    #[test]
    fn test_log_path() {
        assert!(log_path().ends_with(LOG_FILE));
    }
}
