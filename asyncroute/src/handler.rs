//! Type-erased handlers and the conversions into them.
//!
//! Every stage the dispatcher runs is a [`Handler`]: a callable taking a
//! positional [`Args`] list and returning a boxed future of an [`Outcome`].
//! Typed closures and `async fn`s of each supported shape convert into one
//! through [`IntoHandler`].
//!
//! The dispatcher itself ignores a handler's outcome, which is exactly why
//! the adapter in [`crate::wrap`] exists.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::args::{Args, Invocation};
use crate::error::Error;
use crate::next::Next;
use crate::reply::{IntoReply, Reply};
use crate::request::Request;
use crate::response::Response;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a handler's future resolves to. `Ok(None)` is the absent value.
pub type Outcome = Result<Option<Reply>, Error>;

type CallFn = dyn Fn(Args) -> BoxFuture<'static, Outcome> + Send + Sync;

/// Which positional shape a handler expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// request, response, next
    Ordinary,
    /// request, response, next, value, param name
    Binding,
    /// error, request, response, next
    ErrorHandler,
}

/// A type-erased request handler.
#[derive(Clone)]
pub struct Handler {
    kind: HandlerKind,
    adapted: bool,
    call: Arc<CallFn>,
}

impl Handler {
    /// Builds a handler directly from a positional-argument function.
    pub fn from_fn<F>(kind: HandlerKind, f: F) -> Self
    where
        F: Fn(Args) -> BoxFuture<'static, Outcome> + Send + Sync + 'static,
    {
        Self {
            kind,
            adapted: false,
            call: Arc::new(f),
        }
    }

    /// Builds an ordinary handler from a synchronous closure.
    ///
    /// The closure's result is reported like an async handler's would be.
    pub fn sync<F, T, E>(f: F) -> Self
    where
        F: Fn(Request, Response, Next) -> Result<T, E> + Send + Sync + 'static,
        T: IntoReply + Send + 'static,
        E: Into<Error> + Send + 'static,
    {
        typed(HandlerKind::Ordinary, move |inv: Invocation| {
            std::future::ready(f(inv.request, inv.response, inv.next))
        })
    }

    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    /// Whether this handler is already a completion adapter.
    pub fn is_adapted(&self) -> bool {
        self.adapted
    }

    pub(crate) fn mark_adapted(mut self) -> Self {
        self.adapted = true;
        self
    }

    /// Invokes the handler with a positional argument list.
    pub fn call(&self, args: Args) -> BoxFuture<'static, Outcome> {
        (self.call)(args)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("kind", &self.kind)
            .field("adapted", &self.adapted)
            .finish()
    }
}

/// Conversion into a [`Handler`].
///
/// `Shape` names the parameter list the function takes, so one closure type
/// maps to exactly one implementation:
///
/// | shape                              | kind            |
/// |------------------------------------|-----------------|
/// | `(Invocation,)`                    | ordinary        |
/// | `(Request,)`                       | ordinary        |
/// | `(Request, Response)`              | ordinary        |
/// | `(Request, Response, Next)`        | ordinary        |
/// | `(Request, Response, Next, String)`| parameter-binding |
/// | `(Error, Request, Response, Next)` | error           |
///
/// Every function returns a future of `Result<T, E>` where `T: IntoReply` and
/// `E: Into<Error>`.
pub trait IntoHandler<Shape> {
    fn into_handler(self) -> Handler;
}

impl IntoHandler<Handler> for Handler {
    fn into_handler(self) -> Handler {
        self
    }
}

fn typed<F, Fut, T, E>(kind: HandlerKind, f: F) -> Handler
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: IntoReply + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    Handler::from_fn(kind, move |args: Args| -> BoxFuture<'static, Outcome> {
        match Invocation::from_args(&args) {
            Ok(inv) => {
                let fut = f(inv);
                Box::pin(async move {
                    fut.await
                        .map(IntoReply::into_reply)
                        .map_err(Into::<Error>::into)
                })
            }
            Err(err) => Box::pin(async move { Err(err) }),
        }
    })
}

fn missing(role: &str) -> Error {
    Error::internal(format!("handler invoked without a {} argument", role))
}

impl<F, Fut, T, E> IntoHandler<(Invocation,)> for F
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: IntoReply + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    fn into_handler(self) -> Handler {
        typed(HandlerKind::Ordinary, self)
    }
}

impl<F, Fut, T, E> IntoHandler<(Request,)> for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: IntoReply + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    fn into_handler(self) -> Handler {
        typed(HandlerKind::Ordinary, move |inv: Invocation| self(inv.request))
    }
}

impl<F, Fut, T, E> IntoHandler<(Request, Response)> for F
where
    F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: IntoReply + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    fn into_handler(self) -> Handler {
        typed(HandlerKind::Ordinary, move |inv: Invocation| {
            self(inv.request, inv.response)
        })
    }
}

impl<F, Fut, T, E> IntoHandler<(Request, Response, Next)> for F
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: IntoReply + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    fn into_handler(self) -> Handler {
        typed(HandlerKind::Ordinary, move |inv: Invocation| {
            self(inv.request, inv.response, inv.next)
        })
    }
}

impl<F, Fut, T, E> IntoHandler<(Request, Response, Next, String)> for F
where
    F: Fn(Request, Response, Next, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: IntoReply + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    fn into_handler(self) -> Handler {
        typed(HandlerKind::Binding, move |inv: Invocation| {
            let call = match inv.value {
                Some(value) => Ok(self(inv.request, inv.response, inv.next, value)),
                None => Err(missing("parameter value")),
            };
            async move { call?.await.map_err(Into::<Error>::into) }
        })
    }
}

impl<F, Fut, T, E> IntoHandler<(Error, Request, Response, Next)> for F
where
    F: Fn(Error, Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: IntoReply + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    fn into_handler(self) -> Handler {
        typed(HandlerKind::ErrorHandler, move |inv: Invocation| {
            let call = match inv.error {
                Some(error) => Ok(self(error, inv.request, inv.response, inv.next)),
                None => Err(missing("error")),
            };
            async move { call?.await.map_err(Into::<Error>::into) }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Probe;

    async fn hello(_req: Request) -> crate::error::Result<&'static str> {
        Ok("hello")
    }

    async fn bind(
        req: Request,
        _res: Response,
        next: Next,
        user_id: String,
    ) -> crate::error::Result<()> {
        req.insert(user_id);
        next.proceed();
        Ok(())
    }

    async fn render(err: Error, _req: Request, res: Response, _next: Next) -> crate::error::Result<()> {
        res.status(http::StatusCode::INTERNAL_SERVER_ERROR)
            .send(err.message);
        Ok(())
    }

    #[tokio::test]
    async fn test_request_shape_outcome() {
        let handler = hello.into_handler();
        assert_eq!(handler.kind(), HandlerKind::Ordinary);
        assert!(!handler.is_adapted());

        let probe = Probe::get("/");
        let outcome = handler.call(probe.args()).await;
        assert_eq!(outcome, Ok(Some(Reply::Text("hello".to_string()))));
    }

    #[tokio::test]
    async fn test_binding_shape() {
        let handler = bind.into_handler();
        assert_eq!(handler.kind(), HandlerKind::Binding);

        let probe = Probe::get("/user/10");
        let outcome = handler.call(probe.binding_args("10", "userId")).await;
        assert_eq!(outcome, Ok(None));
        assert_eq!(probe.request().get::<String>().as_deref().map(String::as_str), Some("10"));
        assert_eq!(probe.signal(), Some(crate::next::Signal::Proceed));
    }

    #[tokio::test]
    async fn test_binding_shape_without_value_fails() {
        let handler = bind.into_handler();
        let probe = Probe::get("/");
        let outcome = handler.call(probe.args()).await;
        assert_eq!(outcome.unwrap_err().status, 500);
    }

    #[tokio::test]
    async fn test_error_shape() {
        let handler = render.into_handler();
        assert_eq!(handler.kind(), HandlerKind::ErrorHandler);

        let probe = Probe::get("/");
        handler
            .call(probe.error_args(Error::internal("Oops!")))
            .await
            .unwrap();
        let sent = probe.sent().unwrap();
        assert_eq!(sent.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(Probe::text(sent).await, "Oops!");
    }

    #[tokio::test]
    async fn test_sync_handler() {
        let handler = Handler::sync(|req: Request, _res: Response, next: Next| {
            req.insert("Boo!");
            next.proceed();
            Ok::<_, Error>(())
        });

        let probe = Probe::get("/");
        assert_eq!(handler.call(probe.args()).await, Ok(None));
        assert_eq!(probe.request().get::<&'static str>().as_deref(), Some(&"Boo!"));
        assert_eq!(probe.signal(), Some(crate::next::Signal::Proceed));
    }

    #[tokio::test]
    async fn test_sync_handler_error() {
        let handler = Handler::sync(|_req: Request, _res: Response, _next: Next| {
            Err::<(), _>(Error::bad_request("nope"))
        });

        let probe = Probe::get("/");
        assert_eq!(handler.call(probe.args()).await.unwrap_err().status, 400);
    }

    #[tokio::test]
    async fn test_malformed_invocation_fails() {
        let handler = hello.into_handler();
        let outcome = handler.call(Args::new()).await;
        assert!(outcome.unwrap_err().message.contains("request"));
    }
}
