//! Async handler adapter for an Express-style callback router.
//!
//! Handlers registered through an [`AsyncRouter`] may simply return a value
//! or fail: a returned value is sent as the response body and a failure is
//! forwarded to the error-handling stages, so no handler has to remember to
//! call `next(err)` itself.

pub mod app;
pub mod args;
pub mod async_router;
pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod locals;
pub mod next;
pub mod observability;
pub mod reply;
pub mod request;
pub mod response;
pub mod router;
mod server;
pub mod surface;
pub mod testing;
pub mod wrap;

pub use app::App;
pub use async_router::{AsyncRouter, async_router};
pub use wrap::wrap;

pub mod prelude {
    pub use crate::app::App;
    pub use crate::async_router::{AsyncRouter, async_router};
    pub use crate::context::RequestContext;
    pub use crate::error::{Error, IntoApiError, Result, UsageError};
    pub use crate::handler::{Handler, IntoHandler};
    pub use crate::next::Next;
    pub use crate::reply::{IntoReply, Json, Reply};
    pub use crate::request::Request;
    pub use crate::response::Response;
    pub use crate::route_args;
    pub use crate::router::Router;
    pub use crate::surface::{Registrar, RouteArg, Surface, handler};
    pub use crate::wrap::wrap;

    pub use http::{Method, StatusCode};
    pub use serde::{Deserialize, Serialize};
}
