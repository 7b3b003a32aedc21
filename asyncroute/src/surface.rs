//! The registration contract shared by routers and their adapters.
//!
//! A registration surface accepts verb registrations ([`Registrar`]) and,
//! at the top level, also builds route sub-surfaces and binds parameter
//! callbacks ([`Surface`]). Arguments to a registration are a closed
//! [`RouteArg`] list, classified once when the route is registered.

use regex::Regex;

use crate::error::UsageError;
use crate::handler::{Handler, IntoHandler};

/// One positional argument of a registration call.
#[derive(Debug, Clone)]
pub enum RouteArg {
    /// A path pattern such as `/users/:id`.
    Path(String),
    /// A compiled pattern; named captures become path parameters.
    Pattern(Regex),
    /// A nested sequence of arguments, flattened at registration.
    Handlers(Vec<RouteArg>),
    /// A single handler.
    Handler(Handler),
}

impl From<&str> for RouteArg {
    fn from(path: &str) -> Self {
        RouteArg::Path(path.to_string())
    }
}

impl From<String> for RouteArg {
    fn from(path: String) -> Self {
        RouteArg::Path(path)
    }
}

impl From<Regex> for RouteArg {
    fn from(pattern: Regex) -> Self {
        RouteArg::Pattern(pattern)
    }
}

impl From<Handler> for RouteArg {
    fn from(handler: Handler) -> Self {
        RouteArg::Handler(handler)
    }
}

impl From<Vec<RouteArg>> for RouteArg {
    fn from(args: Vec<RouteArg>) -> Self {
        RouteArg::Handlers(args)
    }
}

/// Converts any supported handler shape into a registration argument.
pub fn handler<Shape>(f: impl IntoHandler<Shape>) -> RouteArg {
    RouteArg::Handler(f.into_handler())
}

/// Builds a `Vec<RouteArg>` from paths, patterns, handlers and nested lists.
///
/// Closures and `async fn`s go through [`handler`](crate::surface::handler)
/// first, since their shape can't be inferred from `From`.
///
/// ```
/// use asyncroute::prelude::*;
///
/// async fn hello(_req: Request) -> Result<&'static str> {
///     Ok("hello")
/// }
///
/// let args = route_args!["/hello", handler(hello)];
/// assert_eq!(args.len(), 2);
/// ```
#[macro_export]
macro_rules! route_args {
    ($($arg:expr),* $(,)?) => {
        vec![$($crate::surface::RouteArg::from($arg)),*]
    };
}

/// The path of a route sub-surface.
#[derive(Debug, Clone)]
pub enum RoutePath {
    Path(String),
    Pattern(Regex),
}

impl From<&str> for RoutePath {
    fn from(path: &str) -> Self {
        RoutePath::Path(path.to_string())
    }
}

impl From<String> for RoutePath {
    fn from(path: String) -> Self {
        RoutePath::Path(path)
    }
}

impl From<Regex> for RoutePath {
    fn from(pattern: Regex) -> Self {
        RoutePath::Pattern(pattern)
    }
}

impl std::fmt::Display for RoutePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutePath::Path(path) => f.write_str(path),
            RoutePath::Pattern(pattern) => write!(f, "/{}/", pattern.as_str()),
        }
    }
}

/// Accepts verb registrations.
///
/// Implementors provide [`register`](Registrar::register); the named verb
/// methods forward to it and return `self` for chaining.
pub trait Registrar {
    /// Registers `args` under the operation named `verb`.
    fn register(&self, verb: &str, args: Vec<RouteArg>) -> Result<(), UsageError>;

    /// Mounts middleware or a sub-router (the `use` operation).
    fn mount(&self, args: impl IntoIterator<Item = RouteArg>) -> Result<&Self, UsageError>
    where
        Self: Sized,
    {
        self.register("use", args.into_iter().collect())?;
        Ok(self)
    }

    fn all(&self, args: impl IntoIterator<Item = RouteArg>) -> Result<&Self, UsageError>
    where
        Self: Sized,
    {
        self.register("all", args.into_iter().collect())?;
        Ok(self)
    }

    fn get(&self, args: impl IntoIterator<Item = RouteArg>) -> Result<&Self, UsageError>
    where
        Self: Sized,
    {
        self.register("get", args.into_iter().collect())?;
        Ok(self)
    }

    fn post(&self, args: impl IntoIterator<Item = RouteArg>) -> Result<&Self, UsageError>
    where
        Self: Sized,
    {
        self.register("post", args.into_iter().collect())?;
        Ok(self)
    }

    fn put(&self, args: impl IntoIterator<Item = RouteArg>) -> Result<&Self, UsageError>
    where
        Self: Sized,
    {
        self.register("put", args.into_iter().collect())?;
        Ok(self)
    }

    fn patch(&self, args: impl IntoIterator<Item = RouteArg>) -> Result<&Self, UsageError>
    where
        Self: Sized,
    {
        self.register("patch", args.into_iter().collect())?;
        Ok(self)
    }

    fn delete(&self, args: impl IntoIterator<Item = RouteArg>) -> Result<&Self, UsageError>
    where
        Self: Sized,
    {
        self.register("delete", args.into_iter().collect())?;
        Ok(self)
    }

    fn head(&self, args: impl IntoIterator<Item = RouteArg>) -> Result<&Self, UsageError>
    where
        Self: Sized,
    {
        self.register("head", args.into_iter().collect())?;
        Ok(self)
    }

    fn options(&self, args: impl IntoIterator<Item = RouteArg>) -> Result<&Self, UsageError>
    where
        Self: Sized,
    {
        self.register("options", args.into_iter().collect())?;
        Ok(self)
    }
}

/// A full registration surface: verbs, route sub-surfaces and parameter
/// callbacks.
pub trait Surface: Registrar {
    /// The sub-surface returned by [`route`](Surface::route).
    type Route: Registrar;

    /// Returns a sub-surface whose registrations all share `path`.
    fn route(&self, path: impl Into<RoutePath>) -> Self::Route;

    /// Binds `callback` to the path parameter `name`.
    fn bind_param(&self, name: &str, callback: Handler) -> Result<(), UsageError>;

    /// Binds a parameter callback of any supported shape.
    fn param<Shape>(
        &self,
        name: &str,
        callback: impl IntoHandler<Shape>,
    ) -> Result<&Self, UsageError>
    where
        Self: Sized,
    {
        self.bind_param(name, callback.into_handler())?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::request::Request;

    #[test]
    fn test_route_args_macro_classifies() {
        async fn hello(_req: Request) -> Result<&'static str, Error> {
            Ok("hello")
        }

        let args = route_args![
            "/users/:id",
            Regex::new("^/files/(?P<name>.+)$").unwrap(),
            handler(hello),
            vec![handler(hello), handler(hello)],
        ];

        assert!(matches!(&args[0], RouteArg::Path(p) if p == "/users/:id"));
        assert!(matches!(args[1], RouteArg::Pattern(_)));
        assert!(matches!(args[2], RouteArg::Handler(_)));
        assert!(matches!(&args[3], RouteArg::Handlers(inner) if inner.len() == 2));
    }

    #[test]
    fn test_route_path_display() {
        assert_eq!(RoutePath::from("/users").to_string(), "/users");
        let pattern = RoutePath::from(Regex::new("^/a$").unwrap());
        assert_eq!(pattern.to_string(), "/^/a$/");
    }
}
