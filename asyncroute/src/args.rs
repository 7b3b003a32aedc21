//! Positional argument lists and the rules that classify them.
//!
//! The dispatcher invokes every handler with a positional list in one of
//! three shapes:
//!
//! | shape             | slots                                        |
//! |-------------------|----------------------------------------------|
//! | ordinary          | request, response, next                      |
//! | error             | error, request, response, next               |
//! | parameter-binding | request, response, next, value, param name   |
//!
//! The `find_*` functions pick each role out of a list without knowing which
//! shape it is. [`Invocation::from_args`] runs them once and hands handlers a
//! typed context instead of raw positions.

use smallvec::SmallVec;

use crate::error::Error;
use crate::next::Next;
use crate::request::Request;
use crate::response::Response;

/// Slot count of the parameter-binding shape, the only shape where the
/// continuation is not the last slot.
const PARAM_SHAPE_LEN: usize = 5;
const PARAM_SHAPE_NEXT: usize = 2;

/// One positional argument of a handler invocation.
#[derive(Debug, Clone)]
pub enum Arg {
    Request(Request),
    Response(Response),
    Next(Next),
    Error(Error),
    Value(String),
}

/// A handler invocation's positional arguments.
pub type Args = SmallVec<[Arg; 5]>;

fn next_index(len: usize) -> Option<usize> {
    if len == PARAM_SHAPE_LEN {
        Some(PARAM_SHAPE_NEXT)
    } else {
        len.checked_sub(1)
    }
}

/// The continuation: slot 2 of a five-slot list, otherwise the last slot.
///
/// Falls back to [`Next::noop`] when that slot holds something else.
pub fn find_next(args: &[Arg]) -> Next {
    match next_index(args.len()).and_then(|i| args.get(i)) {
        Some(Arg::Next(next)) => next.clone(),
        _ => Next::noop(),
    }
}

/// The response: the slot right before the continuation slot.
///
/// For the ordinary and error shapes that is the second-to-last slot. In a
/// five-slot parameter-binding list it is slot 1: the second-to-last slot
/// there holds the bound value, not a response.
pub fn find_response(args: &[Arg]) -> Option<Response> {
    let index = next_index(args.len())?.checked_sub(1)?;
    match args.get(index) {
        Some(Arg::Response(res)) => Some(res.clone()),
        _ => None,
    }
}

/// The first error in the list, if any.
pub fn find_error(args: &[Arg]) -> Option<Error> {
    args.iter().find_map(|arg| match arg {
        Arg::Error(err) => Some(err.clone()),
        _ => None,
    })
}

/// The first request in the list, if any.
pub fn find_request(args: &[Arg]) -> Option<Request> {
    args.iter().find_map(|arg| match arg {
        Arg::Request(req) => Some(req.clone()),
        _ => None,
    })
}

/// The first plain value, which is the bound parameter value of a
/// parameter-binding invocation.
pub fn find_value(args: &[Arg]) -> Option<String> {
    args.iter().find_map(|arg| match arg {
        Arg::Value(value) => Some(value.clone()),
        _ => None,
    })
}

/// Named view of one invocation's arguments.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub request: Request,
    pub response: Response,
    pub next: Next,
    pub error: Option<Error>,
    pub value: Option<String>,
}

impl Invocation {
    /// Classifies `args`, failing when no request or response can be found.
    pub fn from_args(args: &[Arg]) -> Result<Self, Error> {
        let request = find_request(args)
            .ok_or_else(|| Error::internal("handler invoked without a request argument"))?;
        let response = find_response(args)
            .ok_or_else(|| Error::internal("handler invoked without a response argument"))?;

        Ok(Self {
            request,
            response,
            next: find_next(args),
            error: find_error(args),
            value: find_value(args),
        })
    }

    /// Ordinary shape: request, response, next.
    pub fn ordinary(request: Request, response: Response, next: Next) -> Args {
        smallvec::smallvec![Arg::Request(request), Arg::Response(response), Arg::Next(next)]
    }

    /// Error shape: error, request, response, next.
    pub fn failed(error: Error, request: Request, response: Response, next: Next) -> Args {
        smallvec::smallvec![
            Arg::Error(error),
            Arg::Request(request),
            Arg::Response(response),
            Arg::Next(next),
        ]
    }

    /// Parameter-binding shape: request, response, next, value, name.
    pub fn binding(
        request: Request,
        response: Response,
        next: Next,
        value: impl Into<String>,
        name: impl Into<String>,
    ) -> Args {
        smallvec::smallvec![
            Arg::Request(request),
            Arg::Response(response),
            Arg::Next(next),
            Arg::Value(value.into()),
            Arg::Value(name.into()),
        ]
    }
}
