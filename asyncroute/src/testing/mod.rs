//! Testing utilities for asyncroute applications.
//!
//! [`TestClient`] serves an [`App`](crate::app::App) on a random local port
//! and sends real HTTP requests to it. [`Probe`] and [`TestRequest`] exercise
//! a single handler without any server at all.

mod client;
mod probe;
mod request;

pub use client::{TestClient, TestRequestBuilder, TestResponse};
pub use probe::Probe;
pub use request::TestRequest;
