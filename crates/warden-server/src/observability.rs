//! Tracing setup for the warden host.
//!
//! `RUST_LOG` always wins. Without it, the level from `[logging]` applies
//! to warden itself while the HTTP stack underneath is held at `warn`.
use std::fmt;
use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, prelude::*, reload};

static LOG_RELOAD_HANDLE: OnceLock<reload::Handle<EnvFilter, tracing_subscriber::Registry>> =
    OnceLock::new();

/// Crates whose chatter stays at `warn` unless `RUST_LOG` says otherwise.
const QUIET_DEPENDENCIES: &[&str] = &["hyper", "hyper_util", "h2", "tower"];

/// Where the active log filter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSource {
    /// `RUST_LOG` environment variable.
    Environment,
    /// `logging.level` from configuration (or the startup default).
    Config,
}

impl fmt::Display for FilterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => f.write_str("RUST_LOG"),
            Self::Config => f.write_str("config"),
        }
    }
}

/// Filter directives for a configured level.
pub fn directives_for(level: &str) -> String {
    let level = level.trim().to_ascii_lowercase();
    if level == "off" {
        return level;
    }
    let mut directives = level;
    for krate in QUIET_DEPENDENCIES {
        directives.push_str(&format!(",{krate}=warn"));
    }
    directives
}

fn rust_log_filter() -> Option<EnvFilter> {
    std::env::var_os("RUST_LOG")?;
    EnvFilter::try_from_default_env().ok()
}

fn config_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(directives_for(level)).unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init_tracing() -> FilterSource {
    init_tracing_with_level("info")
}

/// Installs the global subscriber with a reloadable filter.
///
/// Calling it again is harmless; the first subscriber stays installed.
pub fn init_tracing_with_level(level: &str) -> FilterSource {
    let (filter, source) = match rust_log_filter() {
        Some(filter) => (filter, FilterSource::Environment),
        None => (config_filter(level), FilterSource::Config),
    };

    let (reload_layer, handle) = reload::Layer::new(filter);
    let _ = LOG_RELOAD_HANDLE.set(handle);

    let _ = tracing_subscriber::registry()
        .with(reload_layer)
        .with(tracing_fmt::layer())
        .try_init();

    source
}

/// Switches the running filter to `level`.
///
/// Returns `false` when nothing changed: `RUST_LOG` is set, or tracing was
/// never initialized.
pub fn apply_logging_level(level: &str) -> bool {
    if std::env::var_os("RUST_LOG").is_some() {
        return false;
    }
    let Some(handle) = LOG_RELOAD_HANDLE.get() else {
        return false;
    };
    let applied = handle
        .modify(|filter| *filter = config_filter(level))
        .is_ok();
    if applied {
        tracing::debug!(level, "log level applied");
    }
    applied
}

pub fn shutdown_tracing() {
    tracing::info!("warden stopped");
}
