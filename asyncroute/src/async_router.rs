//! A registration surface that wraps every handler it is given.
//!
//! [`AsyncRouter`] sits in front of any [`Surface`] and passes each handler
//! of an intercepted registration through [`wrap`] before delegating. Route
//! sub-surfaces it hands out are wrapped the same way, and so are parameter
//! callbacks. The underlying surface is never modified, so other holders of
//! it keep registering plain handlers.

use std::sync::Arc;

use crate::config::VerbSet;
use crate::error::UsageError;
use crate::handler::Handler;
use crate::router::Router;
use crate::surface::{Registrar, RouteArg, RoutePath, Surface};
use crate::wrap::wrap;

/// Adapter-aware view of a registration surface.
///
/// # Examples
///
/// ```
/// use asyncroute::prelude::*;
///
/// async fn hello(_req: Request) -> Result<&'static str> {
///     Ok("Success!")
/// }
///
/// let app = App::new();
/// let router = AsyncRouter::wrap(app.clone());
/// router.get(route_args!["/", handler(hello)]).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct AsyncRouter<S> {
    inner: S,
    verbs: Arc<VerbSet>,
}

impl<S> AsyncRouter<S> {
    /// Wraps `surface`, intercepting the default verb set.
    pub fn wrap(surface: S) -> Self {
        Self::with_verbs(surface, VerbSet::default())
    }

    /// Wraps `surface`, intercepting only the registrations named in `verbs`.
    pub fn with_verbs(surface: S, verbs: VerbSet) -> Self {
        Self {
            inner: surface,
            verbs: Arc::new(verbs),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn verbs(&self) -> &VerbSet {
        &self.verbs
    }
}

/// A fresh [`Router`] that wraps everything registered on it.
pub fn async_router() -> AsyncRouter<Router> {
    AsyncRouter::wrap(Router::new())
}

fn wrap_args(args: Vec<RouteArg>) -> Vec<RouteArg> {
    args.into_iter().map(wrap_arg).collect()
}

fn wrap_arg(arg: RouteArg) -> RouteArg {
    match arg {
        RouteArg::Path(_) | RouteArg::Pattern(_) => arg,
        RouteArg::Handlers(nested) => RouteArg::Handlers(wrap_args(nested)),
        RouteArg::Handler(handler) => RouteArg::Handler(wrap(handler)),
    }
}

impl<S: Registrar> Registrar for AsyncRouter<S> {
    fn register(&self, verb: &str, args: Vec<RouteArg>) -> Result<(), UsageError> {
        if self.verbs.contains(verb) {
            self.inner.register(verb, wrap_args(args))
        } else {
            self.inner.register(verb, args)
        }
    }
}

impl<S: Surface> Surface for AsyncRouter<S> {
    type Route = AsyncRouter<S::Route>;

    fn route(&self, path: impl Into<RoutePath>) -> Self::Route {
        AsyncRouter {
            inner: self.inner.route(path),
            verbs: self.verbs.clone(),
        }
    }

    fn bind_param(&self, name: &str, callback: Handler) -> Result<(), UsageError> {
        self.inner.bind_param(name, wrap(callback))
    }
}

impl<S: Into<RouteArg>> From<AsyncRouter<S>> for RouteArg {
    fn from(router: AsyncRouter<S>) -> Self {
        router.inner.into()
    }
}
