//! Reply values and conversion traits.
//!
//! Whatever an async handler resolves to is turned into a [`Reply`] through
//! [`IntoReply`]. `None` from [`IntoReply::into_reply`] means "absent": the
//! adapter sends nothing and leaves completion to the handler.

use bytes::Bytes;
use http::{Response, StatusCode};
use http_body_util::Full;
use serde::Serialize;

/// The body type used for HTTP responses.
pub type BoxBody = Full<Bytes>;

/// A response body value.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Plain text, sent as `text/plain; charset=utf-8`.
    Text(String),
    /// A JSON document, sent as `application/json`.
    Json(serde_json::Value),
    /// Raw bytes, sent as `application/octet-stream`.
    Bytes(Bytes),
    /// A bare status code with an empty body.
    Status(StatusCode),
    /// Any of the above with an explicit status.
    WithStatus(StatusCode, Box<Reply>),
}

impl Reply {
    /// Builds the HTTP response with the given fallback status.
    pub(crate) fn into_response(self, status: StatusCode) -> Response<BoxBody> {
        let (status, content_type, body) = match self {
            Reply::Text(text) => (status, Some("text/plain; charset=utf-8"), Bytes::from(text)),
            Reply::Json(value) => (
                status,
                Some("application/json"),
                Bytes::from(serde_json::to_vec(&value).unwrap_or_default()),
            ),
            Reply::Bytes(bytes) => (status, Some("application/octet-stream"), bytes),
            Reply::Status(status) => (status, None, Bytes::new()),
            Reply::WithStatus(status, inner) => return inner.into_response(status),
        };

        let mut response = Response::new(Full::new(body));
        *response.status_mut() = status;
        if let Some(content_type) = content_type {
            response.headers_mut().insert(
                http::header::CONTENT_TYPE,
                http::HeaderValue::from_static(content_type),
            );
        }
        response
    }
}

/// Trait for values an async handler may resolve to.
///
/// # Examples
///
/// ```
/// use asyncroute::reply::{IntoReply, Reply};
///
/// struct Greeting(String);
///
/// impl IntoReply for Greeting {
///     fn into_reply(self) -> Option<Reply> {
///         Some(Reply::Text(format!("Hello, {}!", self.0)))
///     }
/// }
///
/// assert_eq!(
///     Greeting("John".into()).into_reply(),
///     Some(Reply::Text("Hello, John!".into()))
/// );
/// ```
pub trait IntoReply {
    /// Converts the value, `None` meaning there is nothing to send.
    fn into_reply(self) -> Option<Reply>;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Option<Reply> {
        Some(self)
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Option<Reply> {
        None
    }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> Option<Reply> {
        self.and_then(IntoReply::into_reply)
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Option<Reply> {
        Some(Reply::Text(self.to_owned()))
    }
}

impl IntoReply for String {
    fn into_reply(self) -> Option<Reply> {
        Some(Reply::Text(self))
    }
}

impl IntoReply for serde_json::Value {
    fn into_reply(self) -> Option<Reply> {
        Some(Reply::Json(self))
    }
}

impl IntoReply for Bytes {
    fn into_reply(self) -> Option<Reply> {
        Some(Reply::Bytes(self))
    }
}

impl IntoReply for StatusCode {
    fn into_reply(self) -> Option<Reply> {
        Some(Reply::Status(self))
    }
}

impl<T: IntoReply> IntoReply for (StatusCode, T) {
    fn into_reply(self) -> Option<Reply> {
        let inner = self.1.into_reply().unwrap_or(Reply::Bytes(Bytes::new()));
        Some(Reply::WithStatus(self.0, Box::new(inner)))
    }
}

/// Serializes the wrapped value as a JSON reply.
///
/// A value that fails to serialize produces a JSON `null` body.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoReply for Json<T> {
    fn into_reply(self) -> Option<Reply> {
        Some(Reply::Json(
            serde_json::to_value(&self.0).unwrap_or(serde_json::Value::Null),
        ))
    }
}
