//! Ordered, Express-style request routing.
//!
//! A [`Router`] is a stack of layers matched in registration order against
//! the request path. `use` layers match a path prefix and any method; verb
//! registrations add a [`Route`] layer that matches the whole path and
//! dispatches on the method. Path parameters use the `:param` syntax, or
//! named captures when the path is a compiled [`Regex`].
//!
//! Every stage runs on its own task. The dispatcher waits for the stage's
//! [`Next`] before moving on and never looks at what the stage returned.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use http::Method;
use regex::Regex;
use tracing::{Instrument, debug, error};

use crate::args::{Args, Invocation};
use crate::error::{Error, UsageError};
use crate::handler::{BoxFuture, Handler, HandlerKind, Outcome};
use crate::next::{Next, Signal};
use crate::request::{PathParams, Request};
use crate::response::Response;
use crate::surface::{Registrar, RouteArg, RoutePath, Surface};

/// Registration operations a router understands.
enum Verb {
    Use,
    All,
    Method(Method),
}

impl Verb {
    fn parse(verb: &str) -> Result<Self, UsageError> {
        let method = match verb {
            "use" => return Ok(Verb::Use),
            "all" => return Ok(Verb::All),
            "get" => Method::GET,
            "post" => Method::POST,
            "put" => Method::PUT,
            "patch" => Method::PATCH,
            "delete" => Method::DELETE,
            "head" => Method::HEAD,
            "options" => Method::OPTIONS,
            other => return Err(UsageError::UnsupportedVerb(other.to_string())),
        };
        Ok(Verb::Method(method))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
enum Matcher {
    Segments(Vec<Segment>),
    Pattern(Regex),
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|part| !part.is_empty())
}

/// Percent-decodes a bound parameter. Values that do not decode to UTF-8
/// are kept as they arrived.
fn decode_param(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), Cow::into_owned)
}

impl Matcher {
    fn new(path: &RoutePath) -> Self {
        match path {
            RoutePath::Path(path) => Matcher::Segments(
                split_path(path)
                    .map(|part| match part.strip_prefix(':') {
                        Some(name) => Segment::Param(name.to_string()),
                        None => Segment::Literal(part.to_string()),
                    })
                    .collect(),
            ),
            RoutePath::Pattern(pattern) => Matcher::Pattern(pattern.clone()),
        }
    }

    /// Matches `path`, returning the bound parameters in pattern order.
    ///
    /// With `end` unset, a segment pattern only has to match a prefix of the
    /// path. Compiled patterns carry their own anchors.
    fn matches(&self, path: &str, end: bool) -> Option<Vec<(String, String)>> {
        match self {
            Matcher::Segments(segments) => {
                let parts: Vec<&str> = split_path(path).collect();
                if parts.len() < segments.len() || (end && parts.len() != segments.len()) {
                    return None;
                }

                let mut params = Vec::new();
                for (segment, part) in segments.iter().zip(parts) {
                    match segment {
                        Segment::Param(name) => params.push((name.clone(), decode_param(part))),
                        Segment::Literal(literal) if literal == part => {}
                        Segment::Literal(_) => return None,
                    }
                }
                Some(params)
            }
            Matcher::Pattern(pattern) => {
                let captures = pattern.captures(path)?;
                let params = pattern
                    .capture_names()
                    .enumerate()
                    .skip(1)
                    .filter_map(|(index, name)| {
                        let value = decode_param(captures.get(index)?.as_str());
                        let key = name.map_or_else(|| (index - 1).to_string(), str::to_string);
                        Some((key, value))
                    })
                    .collect();
                Some(params)
            }
        }
    }
}

/// The method-dispatched handlers of one route.
#[derive(Default)]
struct RouteStack {
    entries: RwLock<Vec<(Option<Method>, Handler)>>,
}

impl RouteStack {
    fn push(&self, method: Option<Method>, handlers: Vec<Handler>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.extend(handlers.into_iter().map(|handler| (method.clone(), handler)));
    }

    /// Handlers registered for `method`; `HEAD` also runs `GET` handlers.
    fn stages_for(&self, method: &Method) -> Vec<Handler> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .filter(|(accepted, _)| match accepted {
                None => true,
                Some(accepted) => {
                    accepted == method || (*accepted == Method::GET && *method == Method::HEAD)
                }
            })
            .map(|(_, handler)| handler.clone())
            .collect()
    }
}

enum Target {
    Stage(Handler),
    Route(Arc<RouteStack>),
}

struct Layer {
    matcher: Matcher,
    end: bool,
    target: Target,
}

/// Result of running one stage to its continuation.
enum Step {
    Proceed,
    Fail(Error),
    /// The stage let go of its continuation without signalling.
    Halt,
}

/// An ordered stack of middleware and routes.
///
/// Clones share the same stack, so a router can be registered on from one
/// handle and served from another.
///
/// # Examples
///
/// ```
/// use asyncroute::prelude::*;
///
/// async fn show(req: Request) -> Result<String> {
///     Ok(format!("user {}", req.param("id").unwrap_or_default()))
/// }
///
/// let router = Router::new();
/// router.get(route_args!["/users/:id", handler(show)]).unwrap();
/// assert_eq!(router.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct Router {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    layers: RwLock<Vec<Arc<Layer>>>,
    params: RwLock<HashMap<String, Vec<Handler>>>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("layers", &self.len()).finish()
    }
}

impl Router {
    /// Creates a new empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of layers in the stack.
    pub fn len(&self) -> usize {
        self.inner
            .layers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns this router as an ordinary handler, for mounting inside
    /// another router.
    pub fn handler(&self) -> Handler {
        let router = self.clone();
        Handler::from_fn(HandlerKind::Ordinary, move |args: Args| -> BoxFuture<'static, Outcome> {
            Box::pin(mounted(router.clone(), args))
        })
    }

    /// Runs `req` through the stack.
    ///
    /// `done` is signalled once the stack is exhausted: `proceed` when nothing
    /// failed, `fail` with the error that no error stage recovered from. It is
    /// dropped unsignalled when a stage ends the chain without calling next.
    pub async fn dispatch(&self, req: Request, res: Response, done: Next) {
        let mut error: Option<Error> = None;
        let mut bound: HashMap<String, String> = HashMap::new();

        for layer in self.layers() {
            let Some(params) = layer.matcher.matches(req.path(), layer.end) else {
                continue;
            };
            let stages = match &layer.target {
                Target::Stage(handler) => vec![handler.clone()],
                // routes never handle errors
                Target::Route(_) if error.is_some() => continue,
                Target::Route(route) => route.stages_for(req.method()),
            };
            if stages.is_empty() {
                continue;
            }

            req.set_params(params.iter().cloned().collect::<PathParams>());
            if error.is_none() {
                match self.bind_params(&req, &res, &params, &mut bound).await {
                    Step::Proceed => {}
                    Step::Fail(err) => {
                        error = Some(err);
                        continue;
                    }
                    Step::Halt => return,
                }
            }

            for stage in stages {
                let step = match (&error, stage.kind()) {
                    (None, HandlerKind::ErrorHandler) => continue,
                    (Some(_), HandlerKind::Ordinary | HandlerKind::Binding) => continue,
                    (None, _) => {
                        invoke(&stage, |next| {
                            Invocation::ordinary(req.clone(), res.clone(), next)
                        })
                        .await
                    }
                    (Some(err), HandlerKind::ErrorHandler) => {
                        let err = err.clone();
                        invoke(&stage, |next| {
                            Invocation::failed(err, req.clone(), res.clone(), next)
                        })
                        .await
                    }
                };
                match step {
                    Step::Proceed => error = None,
                    Step::Fail(err) => error = Some(err),
                    Step::Halt => return,
                }
            }
        }

        match error {
            Some(err) => done.fail(err),
            None => done.proceed(),
        }
    }

    /// Runs the parameter callbacks for every bound parameter whose value
    /// has not been seen yet in this dispatch.
    async fn bind_params(
        &self,
        req: &Request,
        res: &Response,
        params: &[(String, String)],
        bound: &mut HashMap<String, String>,
    ) -> Step {
        for (name, value) in params {
            let callbacks = self.callbacks(name);
            if callbacks.is_empty() || bound.get(name) == Some(value) {
                continue;
            }
            bound.insert(name.clone(), value.clone());

            for callback in callbacks {
                let step = invoke(&callback, |next| {
                    Invocation::binding(req.clone(), res.clone(), next, value.clone(), name.clone())
                })
                .await;
                if !matches!(step, Step::Proceed) {
                    return step;
                }
            }
        }
        Step::Proceed
    }

    fn layers(&self) -> Vec<Arc<Layer>> {
        self.inner
            .layers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn callbacks(&self, name: &str) -> Vec<Handler> {
        self.inner
            .params
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    fn push(&self, layer: Layer) {
        self.inner
            .layers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(layer));
    }
}

async fn mounted(router: Router, args: Args) -> Outcome {
    let inv = Invocation::from_args(&args)?;
    router.dispatch(inv.request, inv.response, inv.next).await;
    Ok(None)
}

/// Spawns one stage and waits for its continuation.
async fn invoke(handler: &Handler, args: impl FnOnce(Next) -> Args) -> Step {
    let (next, signalled) = Next::channel();
    let call = handler.call(args(next));
    tokio::spawn(report(call).in_current_span());

    match signalled.await {
        Ok(Signal::Proceed) => Step::Proceed,
        Ok(Signal::Fail(err)) => Step::Fail(err),
        Err(_) => Step::Halt,
    }
}

async fn report(call: BoxFuture<'static, Outcome>) {
    match call.await {
        Ok(None) => {}
        Ok(Some(_)) => debug!("handler result ignored; only wrapped handlers send it"),
        Err(err) => error!(error = %err, "unhandled handler failure; the chain will not see it"),
    }
}

/// Splits registration arguments into an optional leading path and the
/// flattened handler list.
fn split_args(
    verb: &str,
    mut args: Vec<RouteArg>,
) -> Result<(Option<RoutePath>, Vec<Handler>), UsageError> {
    let path = match args.first() {
        Some(RouteArg::Path(_) | RouteArg::Pattern(_)) => match args.remove(0) {
            RouteArg::Path(path) => Some(RoutePath::Path(path)),
            RouteArg::Pattern(pattern) => Some(RoutePath::Pattern(pattern)),
            _ => None,
        },
        _ => None,
    };

    let offset = usize::from(path.is_some()) + 1;
    let mut handlers = Vec::new();
    for (index, arg) in args.into_iter().enumerate() {
        collect_handlers(verb, arg, index + offset, &mut handlers)?;
    }
    if handlers.is_empty() {
        return Err(UsageError::MissingHandler {
            verb: verb.to_string(),
        });
    }
    Ok((path, handlers))
}

fn collect_handlers(
    verb: &str,
    arg: RouteArg,
    position: usize,
    handlers: &mut Vec<Handler>,
) -> Result<(), UsageError> {
    match arg {
        RouteArg::Handler(handler) => handlers.push(handler),
        RouteArg::Handlers(nested) => {
            for arg in nested {
                collect_handlers(verb, arg, position, handlers)?;
            }
        }
        RouteArg::Path(_) | RouteArg::Pattern(_) => {
            return Err(UsageError::MisplacedPattern {
                verb: verb.to_string(),
                position,
            });
        }
    }
    Ok(())
}

impl Registrar for Router {
    fn register(&self, verb: &str, args: Vec<RouteArg>) -> Result<(), UsageError> {
        let parsed = Verb::parse(verb)?;
        let (path, handlers) = split_args(verb, args)?;

        match parsed {
            Verb::Use => {
                let matcher = Matcher::new(&path.unwrap_or_else(|| RoutePath::from("/")));
                for handler in handlers {
                    self.push(Layer {
                        matcher: matcher.clone(),
                        end: false,
                        target: Target::Stage(handler),
                    });
                }
            }
            Verb::All | Verb::Method(_) => {
                let path = path.ok_or_else(|| UsageError::MissingPath {
                    verb: verb.to_string(),
                })?;
                let method = match parsed {
                    Verb::Method(method) => Some(method),
                    _ => None,
                };
                self.route(path).stack.push(method, handlers);
            }
        }
        Ok(())
    }
}

impl Surface for Router {
    type Route = Route;

    fn route(&self, path: impl Into<RoutePath>) -> Route {
        let path = path.into();
        let stack = Arc::new(RouteStack::default());
        self.push(Layer {
            matcher: Matcher::new(&path),
            end: true,
            target: Target::Route(stack.clone()),
        });
        Route { path, stack }
    }

    fn bind_param(&self, name: &str, callback: Handler) -> Result<(), UsageError> {
        if name.is_empty() {
            return Err(UsageError::EmptyParamName);
        }
        self.inner
            .params
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default()
            .push(callback);
        Ok(())
    }
}

impl From<Router> for Handler {
    fn from(router: Router) -> Self {
        router.handler()
    }
}

impl From<Router> for RouteArg {
    fn from(router: Router) -> Self {
        RouteArg::Handler(router.handler())
    }
}

/// A single path inside a [`Router`], registered on by method.
///
/// All registrations on one `Route` share the one layer it was created
/// with, so they run together and in order.
#[derive(Clone)]
pub struct Route {
    path: RoutePath,
    stack: Arc<RouteStack>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path.to_string())
            .finish()
    }
}

impl Route {
    pub fn path(&self) -> &RoutePath {
        &self.path
    }
}

impl Registrar for Route {
    fn register(&self, verb: &str, args: Vec<RouteArg>) -> Result<(), UsageError> {
        let method = match Verb::parse(verb)? {
            Verb::Use => return Err(UsageError::UnsupportedVerb(verb.to_string())),
            Verb::All => None,
            Verb::Method(method) => Some(method),
        };
        let (path, handlers) = split_args(verb, args)?;
        if path.is_some() {
            return Err(UsageError::MisplacedPattern {
                verb: verb.to_string(),
                position: 1,
            });
        }
        self.stack.push(method, handlers);
        Ok(())
    }
}
