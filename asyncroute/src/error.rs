//! Error types for handlers and route registration.
//!
//! [`Error`] is what travels through the continuation: a handler that fails
//! hands one to the error stage, and an error that reaches the end of the
//! chain is rendered as a structured JSON body with a trace ID.
//!
//! [`UsageError`] covers programmer mistakes at registration time. It is
//! never produced while a request is being served.
//!
//! # Domain Errors
//!
//! For type-safe domain errors, implement the [`IntoApiError`] trait:
//!
//! ```rust
//! use asyncroute::error::{Error, IntoApiError};
//!
//! enum UserError {
//!     NotFound(u64),
//!     EmailTaken(String),
//! }
//!
//! impl IntoApiError for UserError {
//!     fn into_api_error(self) -> Error {
//!         match self {
//!             UserError::NotFound(id) => Error::not_found(format!("user {} not found", id)),
//!             UserError::EmailTaken(email) => Error::conflict(format!("email {} taken", email)),
//!         }
//!     }
//! }
//! ```

use serde::Serialize;
use std::fmt;

use http::StatusCode;
use tracing::warn;

use crate::reply::Reply;

/// The JSON structure returned for errors nobody handled.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// The error details.
    pub error: ErrorDetail,
    /// Unique identifier for request tracing.
    pub trace_id: String,
}

/// Detailed error information in the response body.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "BAD_REQUEST").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// A request-time error.
///
/// Handlers return it (or anything convertible into it) to make the adapter
/// forward control to the error stage.
///
/// # Examples
///
/// ```
/// use asyncroute::error::Error;
///
/// let err = Error::not_found("user not found");
/// assert_eq!(err.status, 404);
///
/// let err = Error::bad_request("validation failed")
///     .with_details(serde_json::json!({"field": "email"}));
/// assert!(err.details.is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    /// HTTP status code.
    pub status: u16,
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional error details.
    pub details: Option<serde_json::Value>,
    /// Optional trace ID for this error.
    pub trace_id: Option<String>,
}

impl Error {
    /// Creates a new error with the given status code, code, and message.
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
            trace_id: None,
        }
    }

    /// Adds additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Sets the trace ID for this error.
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Creates a 400 Bad Request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, "BAD_REQUEST", message)
    }

    /// Creates a 401 Unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, "UNAUTHORIZED", message)
    }

    /// Creates a 403 Forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, "FORBIDDEN", message)
    }

    /// Creates a 404 Not Found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, "NOT_FOUND", message)
    }

    /// Creates a 409 Conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(409, "CONFLICT", message)
    }

    /// Creates a 422 Validation Error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(422, "VALIDATION_ERROR", message)
    }

    /// Creates a 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, "INTERNAL_ERROR", message)
    }

    /// Converts this error to an ErrorResponse with the given trace ID.
    pub fn to_response(&self, trace_id: String) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetail {
                code: self.code.clone(),
                message: self.message.clone(),
                details: self.details.clone(),
            },
            trace_id,
        }
    }

    /// Renders the error as the JSON error envelope reply.
    ///
    /// An out-of-range status falls back to 500.
    pub fn render(&self, trace_id: String) -> Reply {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match serde_json::to_value(self.to_response(trace_id)) {
            Ok(body) => Reply::WithStatus(status, Box::new(Reply::Json(body))),
            Err(err) => {
                warn!(error = %err, "failed to serialize error response");
                Reply::Status(status)
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

/// Trait for converting domain errors into API errors.
///
/// Implement this trait on your domain error types so handlers can use the
/// `?` operator on them and have the failure forwarded to the error stage.
pub trait IntoApiError {
    /// Converts this error into an API error.
    fn into_api_error(self) -> Error;
}

impl<T: IntoApiError> From<T> for Error {
    fn from(err: T) -> Self {
        err.into_api_error()
    }
}

/// A type alias for `Result<T, Error>`.
///
/// This is the standard result type returned by async handlers.
pub type Result<T> = std::result::Result<T, Error>;

/// Registration-time mistakes.
///
/// These are raised synchronously by the registration call that caused them
/// and are never retried.
#[derive(Debug)]
pub enum UsageError {
    /// The registration operation name is not known to the surface.
    UnsupportedVerb(String),
    /// A registration call carried no handler at all.
    MissingHandler { verb: String },
    /// A path or pattern appeared where a handler was expected.
    MisplacedPattern { verb: String, position: usize },
    /// A method registration on a router carried no path.
    MissingPath { verb: String },
    /// A parameter-binding registration used an empty parameter name.
    EmptyParamName,
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageError::UnsupportedVerb(verb) => {
                write!(f, "Unsupported registration operation '{}'", verb)
            }
            UsageError::MissingHandler { verb } => {
                write!(f, "{}() requires at least one handler", verb)
            }
            UsageError::MisplacedPattern { verb, position } => {
                write!(
                    f,
                    "{}() expects a handler at argument {} but got a path pattern",
                    verb, position
                )
            }
            UsageError::MissingPath { verb } => {
                write!(f, "{}() requires a path before its handlers", verb)
            }
            UsageError::EmptyParamName => write!(f, "param() requires a parameter name"),
        }
    }
}

impl std::error::Error for UsageError {}
