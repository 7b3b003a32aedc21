//! The response handle passed to every stage of a chain.
//!
//! A [`Response`] is committed by its first send. After that the status,
//! headers and body are frozen and further sends are ignored.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::reply::{BoxBody, IntoReply, Reply};

/// Receiving end handed to the transport; resolves once the response commits.
pub type Delivery = oneshot::Receiver<http::Response<BoxBody>>;

/// A shared handle to the response of one request.
#[derive(Clone)]
pub struct Response {
    inner: Arc<Inner>,
}

struct Inner {
    committed: AtomicBool,
    pending: Mutex<Pending>,
}

struct Pending {
    status: StatusCode,
    headers: HeaderMap,
    sender: Option<oneshot::Sender<http::Response<BoxBody>>>,
}

impl Response {
    /// Creates a response handle and the receiver that gets the committed
    /// `http::Response`.
    pub fn channel() -> (Self, Delivery) {
        let (sender, delivery) = oneshot::channel();
        let response = Self {
            inner: Arc::new(Inner {
                committed: AtomicBool::new(false),
                pending: Mutex::new(Pending {
                    status: StatusCode::OK,
                    headers: HeaderMap::new(),
                    sender: Some(sender),
                }),
            }),
        };
        (response, delivery)
    }

    /// Whether the response has already been sent.
    pub fn is_committed(&self) -> bool {
        self.inner.committed.load(Ordering::Acquire)
    }

    /// Sets the status used by the next send.
    pub fn status(&self, status: StatusCode) -> &Self {
        self.pending().status = status;
        self
    }

    /// Sets a header used by the next send, overriding the body's content type.
    pub fn header(&self, name: HeaderName, value: HeaderValue) -> &Self {
        self.pending().headers.insert(name, value);
        self
    }

    /// Sends `body` and commits the response.
    ///
    /// Returns `false` if the response was already committed.
    pub fn send(&self, body: impl IntoReply) -> bool {
        self.send_reply(body.into_reply())
    }

    /// Serializes `value` as a JSON body and commits the response.
    pub fn json<T: Serialize>(&self, value: &T) -> bool {
        match serde_json::to_value(value) {
            Ok(value) => self.send_reply(Some(Reply::Json(value))),
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize JSON response body");
                self.status(StatusCode::INTERNAL_SERVER_ERROR)
                    .send_reply(None)
            }
        }
    }

    /// Commits the response with an empty body.
    pub fn end(&self) -> bool {
        self.send_reply(None)
    }

    pub(crate) fn send_reply(&self, reply: Option<Reply>) -> bool {
        let mut pending = self.pending();
        let Some(sender) = pending.sender.take() else {
            tracing::warn!("response already committed; send ignored");
            return false;
        };
        self.inner.committed.store(true, Ordering::Release);

        let mut response = match reply {
            Some(reply) => reply.into_response(pending.status),
            None => {
                let mut response = http::Response::new(Full::new(Bytes::new()));
                *response.status_mut() = pending.status;
                response
            }
        };
        for (name, value) in pending.headers.drain().filter_map(|(k, v)| k.map(|k| (k, v))) {
            response.headers_mut().insert(name, value);
        }
        drop(pending);

        if sender.send(response).is_err() {
            tracing::debug!("transport went away before the response was delivered");
        }
        true
    }

    /// Whether two handles refer to the same response.
    pub fn same_as(&self, other: &Response) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, Pending> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("committed", &self.is_committed())
            .finish()
    }
}
