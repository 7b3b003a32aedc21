//! The application: a top-level router plus the final handler.

use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderValue, StatusCode};
use http_body_util::Full;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::context::TRACE_ID_HEADER;
use crate::error::{Error, UsageError};
use crate::handler::Handler;
use crate::next::{Next, Signal};
use crate::reply::BoxBody;
use crate::request::Request;
use crate::response::Response;
use crate::router::{Route, Router};
use crate::server::serve;
use crate::surface::{Registrar, RouteArg, RoutePath, Surface};

/// The main application type.
///
/// `App` is a registration surface backed by a [`Router`]. Requests that
/// fall off the end of the stack get a 404, and errors that no error stage
/// recovered from are rendered as the JSON error envelope.
///
/// # Examples
///
/// ```ignore
/// use asyncroute::prelude::*;
///
/// async fn hello(_req: Request) -> Result<&'static str> {
///     Ok("Hello, world!")
/// }
///
/// #[tokio::main]
/// async fn main() -> std::io::Result<()> {
///     let app = App::new();
///     AsyncRouter::wrap(app.clone())
///         .get(route_args!["/", handler(hello)])
///         .unwrap();
///     app.listen("127.0.0.1:3000").await
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct App {
    router: Router,
}

impl App {
    /// Creates a new application with an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// The top-level router.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Runs one request through the application and resolves its response.
    ///
    /// The first response committed by any stage wins. If the chain stalls
    /// without ever committing one, the response is an empty 500. The
    /// request's trace ID is echoed in `x-trace-id` unless a stage set it.
    pub async fn handle(&self, request: http::Request<Bytes>) -> http::Response<BoxBody> {
        let req = Request::new(request);
        let span = info_span!(
            "request",
            method = %req.method(),
            path = %req.path(),
            trace_id = %req.trace_id(),
        );

        async move {
            let mut response = self.respond(req.clone()).await;
            if let Ok(trace_id) = HeaderValue::from_str(req.trace_id()) {
                response
                    .headers_mut()
                    .entry(TRACE_ID_HEADER)
                    .or_insert(trace_id);
            }
            info!(
                status = response.status().as_u16(),
                duration_ms = req.context().elapsed().as_millis() as u64,
                "request completed"
            );
            response
        }
        .instrument(span)
        .await
    }

    async fn respond(&self, req: Request) -> http::Response<BoxBody> {
        let (res, mut delivery) = Response::channel();
        let (done, finished) = Next::channel();

        let router = self.router.clone();
        tokio::spawn(
            {
                let (req, res) = (req.clone(), res.clone());
                async move { router.dispatch(req, res, done).await }
            }
            .in_current_span(),
        );

        tokio::select! {
            delivered = &mut delivery => return delivered.unwrap_or_else(|_| stalled()),
            signal = finished => match signal {
                Ok(Signal::Proceed) => finish_unmatched(&req, &res),
                Ok(Signal::Fail(err)) => finish_failed(&req, &res, err),
                Err(_) => debug!("chain ended without reaching the final handler"),
            },
        }

        drop(res);
        delivery.await.unwrap_or_else(|_| stalled())
    }

    /// Starts the HTTP server on `addr` and serves until ctrl-c.
    pub async fn listen(self, addr: &str) -> std::io::Result<()> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;
        serve(self, addr).await
    }
}

fn stalled() -> http::Response<BoxBody> {
    warn!("request chain ended without sending a response");
    let mut response = http::Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

fn finish_unmatched(req: &Request, res: &Response) {
    if res.is_committed() {
        return;
    }
    res.status(StatusCode::NOT_FOUND)
        .send(format!("Cannot {} {}", req.method(), req.path()));
}

fn finish_failed(req: &Request, res: &Response, err: Error) {
    if res.is_committed() {
        warn!(error = %err, "error reached the final handler after the response was sent");
        return;
    }

    let trace_id = err
        .trace_id
        .clone()
        .unwrap_or_else(|| req.trace_id().to_string());
    res.send(err.render(trace_id));
}

impl Registrar for App {
    fn register(&self, verb: &str, args: Vec<RouteArg>) -> Result<(), UsageError> {
        self.router.register(verb, args)
    }
}

impl Surface for App {
    type Route = Route;

    fn route(&self, path: impl Into<RoutePath>) -> Route {
        self.router.route(path)
    }

    fn bind_param(&self, name: &str, callback: Handler) -> Result<(), UsageError> {
        self.router.bind_param(name, callback)
    }
}
