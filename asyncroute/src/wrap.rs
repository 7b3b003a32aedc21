//! The completion adapter for a single handler.
//!
//! [`wrap`] turns any handler into one that reports its own completion:
//!
//! - an error already travelling through the chain is forwarded to the
//!   continuation and the handler is skipped;
//! - a resolved value that is not absent is sent as the response body;
//! - a failure is forwarded to the continuation.
//!
//! Once the response is committed, the adapter neither sends nor forwards.
//! A failure after commit cannot reach the error stage any more; it is
//! logged at `warn` level and dropped.

use tracing::{Instrument, debug_span, warn};

use crate::args::{self, Args};
use crate::handler::{BoxFuture, Handler, IntoHandler, Outcome};

/// Wraps `handler` in a completion adapter of the same kind.
///
/// Wrapping an adapter again returns it unchanged.
///
/// # Examples
///
/// ```
/// use asyncroute::prelude::*;
///
/// async fn greet(_req: Request) -> Result<&'static str> {
///     Ok("Success!")
/// }
///
/// let handler = asyncroute::wrap(greet);
/// assert!(handler.is_adapted());
/// ```
pub fn wrap<Shape>(handler: impl IntoHandler<Shape>) -> Handler {
    let inner = handler.into_handler();
    if inner.is_adapted() {
        return inner;
    }

    let kind = inner.kind();
    Handler::from_fn(kind, move |args: Args| -> BoxFuture<'static, Outcome> {
        let span = debug_span!("async_handler", ?kind);
        Box::pin(adapt(inner.clone(), args).instrument(span))
    })
    .mark_adapted()
}

/// The adapter reports everything through the response and continuation,
/// so its own outcome is always the absent value.
async fn adapt(inner: Handler, args: Args) -> Outcome {
    complete(inner, args).await;
    Ok(None)
}

async fn complete(inner: Handler, args: Args) {
    let response = args::find_response(&args);
    let next = args::find_next(&args);
    if next.is_noop() {
        warn!("no continuation in handler arguments; completion signals will be discarded");
    }

    if let Some(err) = args::find_error(&args) {
        next.fail(err);
        return;
    }

    let committed = || response.as_ref().is_some_and(|res| res.is_committed());

    match inner.call(args).await {
        Ok(None) => {}
        Ok(Some(reply)) => match &response {
            Some(res) if !res.is_committed() => {
                res.send_reply(Some(reply));
            }
            Some(_) => {}
            None => warn!("handler produced a value but no response argument was found"),
        },
        Err(err) if committed() => {
            warn!(
                error = %err,
                "handler failed after the response was committed; error dropped"
            );
        }
        Err(err) => next.fail(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::{Error, Result};
    use crate::handler::HandlerKind;
    use crate::next::{Next, Signal};
    use crate::reply::Json;
    use crate::request::Request;
    use crate::response::Response;
    use crate::testing::Probe;

    async fn succeed(_req: Request) -> Result<&'static str> {
        Ok("Success!")
    }

    async fn oops(_req: Request, _res: Response, _next: Next) -> Result<()> {
        Err(Error::internal("Oops!"))
    }

    fn counting(calls: Arc<AtomicUsize>) -> Handler {
        (move |_req: Request| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>("counted")
            }
        })
        .into_handler()
    }

    #[tokio::test]
    async fn test_value_is_sent() {
        let probe = Probe::get("/test");
        let outcome = wrap(succeed).call(probe.args()).await;

        assert_eq!(outcome, Ok(None));
        let sent = probe.sent().unwrap();
        assert_eq!(sent.status(), http::StatusCode::OK);
        assert_eq!(Probe::text(sent).await, "Success!");
        assert_eq!(probe.signal(), None);
    }

    #[tokio::test]
    async fn test_value_sent_once_and_handler_called_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = Probe::get("/");
        wrap(counting(calls.clone())).call(probe.args()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(probe.response().is_committed());
        assert!(!probe.response().send("again"));
    }

    #[tokio::test]
    async fn test_failure_is_forwarded() {
        let probe = Probe::get("/test");
        wrap(oops).call(probe.args()).await.unwrap();

        assert_eq!(probe.signal(), Some(Signal::Fail(Error::internal("Oops!"))));
        assert!(!probe.response().is_committed());
    }

    #[tokio::test]
    async fn test_propagated_error_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = Probe::get("/");
        let handler = wrap(counting(calls.clone()));

        handler
            .call(probe.error_args(Error::not_found("upstream")))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(probe.signal(), Some(Signal::Fail(Error::not_found("upstream"))));
        assert!(!probe.response().is_committed());
    }

    #[tokio::test]
    async fn test_failure_after_commit_is_swallowed() {
        let probe = Probe::get("/");
        let handler = wrap(|_req: Request, res: Response| async move {
            res.send("partial");
            Err::<(), _>(Error::internal("too late"))
        });

        handler.call(probe.args()).await.unwrap();

        assert_eq!(probe.signal(), None);
        assert_eq!(Probe::text(probe.sent().unwrap()).await, "partial");
    }

    #[tokio::test]
    async fn test_value_after_commit_is_not_sent_again() {
        let probe = Probe::get("/");
        let handler = wrap(|_req: Request, res: Response| async move {
            res.send("from handler");
            Ok::<_, Error>("from return")
        });

        handler.call(probe.args()).await.unwrap();

        assert_eq!(Probe::text(probe.sent().unwrap()).await, "from handler");
    }

    #[tokio::test]
    async fn test_absent_value_leaves_response_alone() {
        let probe = Probe::get("/");
        let handler = wrap(|_req: Request, _res: Response, next: Next| async move {
            next.proceed();
            Ok::<_, Error>(())
        });

        handler.call(probe.args()).await.unwrap();

        assert!(!probe.response().is_committed());
        assert_eq!(probe.signal(), Some(Signal::Proceed));
    }

    #[tokio::test]
    async fn test_json_value_is_sent() {
        let probe = Probe::get("/");
        let handler = wrap(|req: Request| async move {
            Ok::<_, Error>(Json(serde_json::json!({ "path": req.path() })))
        });

        handler.call(probe.args()).await.unwrap();

        let body: serde_json::Value =
            serde_json::from_str(&Probe::text(probe.sent().unwrap()).await).unwrap();
        assert_eq!(body["path"], "/");
    }

    #[tokio::test]
    async fn test_sync_failure_is_forwarded() {
        let probe = Probe::get("/");
        let handler = wrap(Handler::sync(|_req: Request, _res: Response, _next: Next| {
            Err::<(), _>(Error::bad_request("sync"))
        }));

        handler.call(probe.args()).await.unwrap();

        assert_eq!(probe.signal(), Some(Signal::Fail(Error::bad_request("sync"))));
    }

    #[tokio::test]
    async fn test_missing_continuation_is_tolerated() {
        let probe = Probe::get("/");
        let mut args = probe.args();
        args.pop();
        args.push(crate::args::Arg::Value("not a continuation".into()));

        let outcome = wrap(oops).call(args).await;
        assert_eq!(outcome, Ok(None));
        assert_eq!(probe.signal(), None);
    }

    #[test]
    fn test_wrap_keeps_kind_and_is_idempotent() {
        let handler = wrap(|_err: Error, _req: Request, _res: Response, _next: Next| async move {
            Ok::<_, Error>(())
        });
        assert_eq!(handler.kind(), HandlerKind::ErrorHandler);
        assert!(handler.is_adapted());

        let again = wrap(handler.clone());
        assert!(again.is_adapted());
        assert_eq!(again.kind(), HandlerKind::ErrorHandler);
    }
}
