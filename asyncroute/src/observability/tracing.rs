use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{ConfigError, get_env, get_env_or};

pub const LOG_LEVEL_ENV: &str = "ASYNCROUTE_LOG_LEVEL";
pub const LOG_FORMAT_ENV: &str = "ASYNCROUTE_LOG_FORMAT";

/// Configuration for the tracing/logging system.
///
/// `RUST_LOG` still wins over [`level`](TracingConfig::level) when it is set.
///
/// # Examples
///
/// ```ignore
/// use asyncroute::observability::TracingConfig;
///
/// // JSON logging for production
/// TracingConfig::new().json().init();
///
/// // or from ASYNCROUTE_LOG_LEVEL / ASYNCROUTE_LOG_FORMAT
/// TracingConfig::from_env()?.init();
/// ```
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Output logs as JSON.
    pub json: bool,
    /// The minimum log level.
    pub level: Level,
    /// Include the target (module path) in logs.
    pub with_target: bool,
    /// Write through the test harness so output is captured per test.
    pub test_writer: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: Level::INFO,
            with_target: true,
            test_writer: false,
        }
    }
}

impl TracingConfig {
    /// Creates a new tracing configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `ASYNCROUTE_LOG_LEVEL` (`trace` to `error`) and
    /// `ASYNCROUTE_LOG_FORMAT` (`text` or `json`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(level) = get_env(LOG_LEVEL_ENV) {
            config.level = level.parse().map_err(|_| ConfigError::Invalid {
                key: LOG_LEVEL_ENV.to_string(),
                value: level,
            })?;
        }

        match get_env_or(LOG_FORMAT_ENV, "text").to_ascii_lowercase().as_str() {
            "text" => {}
            "json" => config.json = true,
            other => {
                return Err(ConfigError::Invalid {
                    key: LOG_FORMAT_ENV.to_string(),
                    value: other.to_string(),
                });
            }
        }

        Ok(config)
    }

    /// Enables JSON output format.
    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Sets the minimum log level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Configures whether to include the target in logs.
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    pub fn test_writer(mut self) -> Self {
        self.test_writer = true;
        self
    }

    /// Installs the global subscriber.
    ///
    /// Returns `false` if one was already installed, which leaves the
    /// existing one in place.
    pub fn init(self) -> bool {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.to_string()));
        let builder = fmt().with_env_filter(filter).with_target(self.with_target);

        let installed = match (self.json, self.test_writer) {
            (true, true) => builder.json().with_test_writer().try_init(),
            (true, false) => builder.json().try_init(),
            (false, true) => builder.with_test_writer().try_init(),
            (false, false) => builder.try_init(),
        };
        installed.is_ok()
    }
}
