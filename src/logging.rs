//! Process-wide logging setup.
//!
//! The first call to [`apply`] installs a `tracing-subscriber` fmt subscriber
//! whose `EnvFilter` sits behind a reload layer. Later calls only swap the
//! filter, so an embedder can raise or lower verbosity at runtime through
//! [`crate::update::AutoUpdater::set_log_config`].
//!
//! When the host application already installed its own global subscriber,
//! [`apply`] leaves it alone, logs a warning and reports [`LogSetup::External`];
//! events then flow into the host's subscriber under the host's filter.

use anyhow::{Context, Result};
use std::sync::OnceLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

use crate::config::LoggerConfig;

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// What [`apply`] did with the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSetup {
    /// The subscriber was installed by this call.
    Installed,
    /// The filter of the previously installed subscriber was replaced.
    Reloaded,
    /// Another global subscriber owns the output; the configuration was not applied.
    External,
}

impl LogSetup {
    /// Whether the requested filter is now in effect.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        !matches!(self, Self::External)
    }
}

/// Install the subscriber, or reload its filter if it is already installed.
///
/// # Errors
///
/// Fails when `config.level` is not a valid filter directive, or when the
/// installed filter can no longer be reloaded.
pub fn apply(config: &LoggerConfig) -> Result<LogSetup> {
    let filter = parse_filter(&config.level)?;

    if let Some(handle) = FILTER_HANDLE.get() {
        handle
            .reload(filter)
            .with_context(|| format!("Failed to reload log filter '{}'", config.level))?;
        return Ok(LogSetup::Reloaded);
    }

    let (filter_layer, handle) = reload::Layer::new(filter);
    let installed = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_target(config.with_target).with_ansi(config.ansi))
        .try_init();

    match installed {
        Ok(()) => {
            let _ = FILTER_HANDLE.set(handle);
            Ok(LogSetup::Installed)
        }
        Err(e) => {
            tracing::warn!(
                "Log level '{}' not applied, another global subscriber is installed: {e}",
                config.level
            );
            Ok(LogSetup::External)
        }
    }
}

/// The filter currently in effect, if [`apply`] installed the subscriber.
#[must_use]
pub fn current_filter() -> Option<String> {
    FILTER_HANDLE.get().and_then(|handle| handle.with_current(ToString::to_string).ok())
}

fn parse_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{level}'"))
}
