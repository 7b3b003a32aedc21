//! Logging setup for asyncroute applications.

mod tracing;

pub use self::tracing::{LOG_FORMAT_ENV, LOG_LEVEL_ENV, TracingConfig};
