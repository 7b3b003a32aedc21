//! The request handle passed to every stage of a chain.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

use crate::context::RequestContext;
use crate::locals::Locals;

/// Path parameters bound by the layer currently being run.
pub type PathParams = HashMap<String, String>;

/// A shared handle to one incoming request.
///
/// Cloning is cheap and every clone sees the same params and locals, so a
/// parameter-binding callback can attach a value that a later handler reads.
#[derive(Clone)]
pub struct Request {
    inner: Arc<Inner>,
}

struct Inner {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    context: RequestContext,
    params: Mutex<PathParams>,
    locals: Mutex<Locals>,
}

impl Request {
    /// Builds a request handle from a fully read HTTP request.
    pub fn new(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        let context = parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_else(|| RequestContext::from_headers(&parts.headers));

        Self {
            inner: Arc::new(Inner {
                method: parts.method,
                uri: parts.uri,
                headers: parts.headers,
                body,
                context,
                params: Mutex::new(PathParams::new()),
                locals: Mutex::new(Locals::new()),
            }),
        }
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    pub fn path(&self) -> &str {
        self.inner.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.inner.body
    }

    pub fn context(&self) -> &RequestContext {
        &self.inner.context
    }

    pub fn trace_id(&self) -> &str {
        &self.inner.context.trace_id
    }

    /// Returns one bound path parameter.
    pub fn param(&self, name: &str) -> Option<String> {
        self.inner
            .params
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Returns a snapshot of all bound path parameters.
    pub fn params(&self) -> PathParams {
        self.inner
            .params
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_params(&self, params: PathParams) {
        *self
            .inner
            .params
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = params;
    }

    /// Attaches a typed value for later stages.
    pub fn insert<T: Send + Sync + 'static>(&self, value: T) {
        self.inner
            .locals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(value);
    }

    /// Reads a value attached by an earlier stage.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.inner
            .locals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get::<T>()
    }

    /// Whether two handles refer to the same request.
    pub fn same_as(&self, other: &Request) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.inner.method)
            .field("uri", &self.inner.uri)
            .field("trace_id", &self.inner.context.trace_id)
            .finish()
    }
}
