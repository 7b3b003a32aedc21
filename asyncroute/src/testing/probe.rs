use std::sync::{Mutex, PoisonError};

use http_body_util::BodyExt;

use crate::args::{Args, Invocation};
use crate::error::Error;
use crate::next::{Next, Signal, Signalled};
use crate::reply::BoxBody;
use crate::request::Request;
use crate::response::{Delivery, Response};

use super::TestRequest;

/// Builds argument lists for one handler call and records what the handler
/// did with its response and continuation.
///
/// ```
/// use asyncroute::prelude::*;
/// use asyncroute::testing::Probe;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// async fn hello(_req: Request) -> Result<&'static str> {
///     Ok("hello")
/// }
///
/// let probe = Probe::get("/");
/// asyncroute::wrap(hello).call(probe.args()).await.unwrap();
/// assert_eq!(Probe::text(probe.sent().unwrap()).await, "hello");
/// # }
/// ```
pub struct Probe {
    request: Request,
    response: Response,
    next: Next,
    delivery: Mutex<Delivery>,
    signalled: Mutex<Signalled>,
}

impl Probe {
    pub fn new(request: Request) -> Self {
        let (response, delivery) = Response::channel();
        let (next, signalled) = Next::channel();
        Self {
            request,
            response,
            next,
            delivery: Mutex::new(delivery),
            signalled: Mutex::new(signalled),
        }
    }

    /// A probe around a GET request for `path`.
    pub fn get(path: &str) -> Self {
        Self::new(TestRequest::get(path).build())
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn next(&self) -> &Next {
        &self.next
    }

    /// Ordinary shape: request, response, next.
    pub fn args(&self) -> Args {
        Invocation::ordinary(
            self.request.clone(),
            self.response.clone(),
            self.next.clone(),
        )
    }

    /// Error shape: error, request, response, next.
    pub fn error_args(&self, err: Error) -> Args {
        Invocation::failed(
            err,
            self.request.clone(),
            self.response.clone(),
            self.next.clone(),
        )
    }

    /// Parameter-binding shape: request, response, next, value, name.
    pub fn binding_args(&self, value: &str, name: &str) -> Args {
        Invocation::binding(
            self.request.clone(),
            self.response.clone(),
            self.next.clone(),
            value,
            name,
        )
    }

    /// The signal the handler delivered, if it has delivered one yet.
    pub fn signal(&self) -> Option<Signal> {
        self.signalled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_recv()
            .ok()
    }

    /// The committed response, if the handler sent one.
    pub fn sent(&self) -> Option<http::Response<BoxBody>> {
        self.delivery
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_recv()
            .ok()
    }

    /// Collects a response body as text.
    pub async fn text(response: http::Response<BoxBody>) -> String {
        let body = response
            .into_body()
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .unwrap_or_default();
        String::from_utf8_lossy(&body).to_string()
    }
}
