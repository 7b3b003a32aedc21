//! Type-safe configuration loading from environment variables
//!
//! This module provides utilities for loading configuration from
//! environment variables and `.env` files, plus the two settings asyncroute
//! itself reads: the intercepted verb set and the listen address.

use std::collections::BTreeSet;
use std::env;
use std::str::FromStr;

/// Load environment variables from `.env` files if it exists.
///
/// Call this at the start of your application before accessing config.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Get a required environment variable.
///
/// Returns an error if the variable is not set.
pub fn get_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key.to_string()))
}

/// Get an optional environment with a default value
pub fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get and parse an environment variable.
pub fn get_env_parsed<T: FromStr>(key: &str) -> Result<T, ConfigError> {
    let value = get_env(key)?;
    value.parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value,
    })
}

/// Get and parse an environment variable with a default.
pub fn get_env_parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Configuration loading errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Environment variable is not set.
    Missing(String),
    /// Environment variable value is invalid.
    Invalid { key: String, value: String },
}
impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => {
                write!(f, "Missing required environment variable '{}'", key)
            }
            ConfigError::Invalid { key, value } => {
                write!(
                    f,
                    "Invalid value '{}' for environment variable '{}' (failed to parse as expected type)",
                    value, key
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Environment variable holding a comma separated verb list.
pub const VERBS_ENV: &str = "ASYNCROUTE_VERBS";
pub const HOST_ENV: &str = "ASYNCROUTE_HOST";
pub const PORT_ENV: &str = "ASYNCROUTE_PORT";

const DEFAULT_VERBS: [&str; 7] = ["use", "get", "post", "put", "patch", "delete", "head"];

/// The registration operations an [`AsyncRouter`](crate::AsyncRouter)
/// intercepts.
///
/// Names are stored lowercase. The default covers the common HTTP verbs plus
/// the `use` catch-all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerbSet {
    verbs: BTreeSet<String>,
}

impl Default for VerbSet {
    fn default() -> Self {
        Self::new(DEFAULT_VERBS)
    }
}

impl VerbSet {
    pub fn new<I, S>(verbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            verbs: verbs
                .into_iter()
                .map(|verb| verb.as_ref().trim().to_ascii_lowercase())
                .filter(|verb| !verb.is_empty())
                .collect(),
        }
    }

    /// Loads the verb set from `ASYNCROUTE_VERBS`, falling back to the
    /// default when it is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let Ok(raw) = get_env(VERBS_ENV) else {
            return Ok(Self::default());
        };
        let verbs = Self::new(raw.split(','));
        if verbs.verbs.is_empty() {
            return Err(ConfigError::Invalid {
                key: VERBS_ENV.to_string(),
                value: raw,
            });
        }
        Ok(verbs)
    }

    pub fn contains(&self, verb: &str) -> bool {
        self.verbs.contains(&verb.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.verbs.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.verbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }
}

/// Where [`App::listen`](crate::App::listen) binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// Reads `ASYNCROUTE_HOST` and `ASYNCROUTE_PORT`.
    ///
    /// Missing variables use the defaults; an unparsable port is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let port = match get_env_parsed(PORT_ENV) {
            Ok(port) => port,
            Err(ConfigError::Missing(_)) => defaults.port,
            Err(err) => return Err(err),
        };
        Ok(Self {
            host: get_env_or(HOST_ENV, &defaults.host),
            port,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
