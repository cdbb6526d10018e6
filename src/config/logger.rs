use serde::{Deserialize, Serialize};

/// Logger settings applied through [`crate::logging::apply`].
///
/// `level` accepts anything `tracing_subscriber::EnvFilter` understands, from a
/// bare level (`"debug"`) to per-target directives (`"info,git=debug"`). Only
/// `level` can be changed after the subscriber is installed; `with_target` and
/// `ansi` are read once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Filter directive, e.g. `"info"` or `"warn,git_autoupdate=debug"`.
    #[serde(default = "default_level")]
    pub level: String,

    /// Show the event target (module path) in each line.
    #[serde(default)]
    pub with_target: bool,

    /// Colorize output.
    #[serde(default = "default_ansi")]
    pub ansi: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            with_target: false,
            ansi: default_ansi(),
        }
    }
}

impl LoggerConfig {
    /// Logger configuration with the given filter directive and default formatting.
    pub fn with_level(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

const fn default_ansi() -> bool {
    true
}
