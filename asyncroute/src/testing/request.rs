use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use serde::Serialize;

use crate::context::RequestContext;
use crate::request::Request;

/// A request builder for driving handlers without a server.
pub struct TestRequest {
    method: http::Method,
    uri: String,
    headers: http::HeaderMap,
    body: Bytes,
    context: Option<RequestContext>,
}

impl TestRequest {
    /// Create a request with the given method
    pub fn new(method: http::Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            headers: http::HeaderMap::new(),
            body: Bytes::new(),
            context: None,
        }
    }

    /// Create a new GET request
    pub fn get(uri: &str) -> Self {
        Self::new(http::Method::GET, uri)
    }

    /// Create a new POST request
    pub fn post(uri: &str) -> Self {
        Self::new(http::Method::POST, uri)
    }

    /// Create a new PUT request
    pub fn put(uri: &str) -> Self {
        Self::new(http::Method::PUT, uri)
    }

    /// Create a new DELETE request
    pub fn delete(uri: &str) -> Self {
        Self::new(http::Method::DELETE, uri)
    }

    /// Add a header to the request
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(
            HeaderName::from_bytes(key.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
        self
    }

    /// Set a JSON body on the request
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        self.body = Bytes::from(serde_json::to_vec(body).unwrap());
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self
    }

    /// Set raw body bytes
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Use a fixed request context instead of a generated one
    pub fn context(mut self, ctx: RequestContext) -> Self {
        self.context = Some(ctx);
        self
    }

    /// Build the plain HTTP request
    pub fn into_http(self) -> http::Request<Bytes> {
        let mut builder = http::Request::builder().method(self.method).uri(self.uri);
        for (key, value) in self.headers.iter() {
            builder = builder.header(key, value);
        }
        if let Some(ctx) = self.context {
            builder = builder.extension(ctx);
        }
        builder.body(self.body).unwrap()
    }

    /// Build the request handle handlers receive
    pub fn build(self) -> Request {
        Request::new(self.into_http())
    }
}
