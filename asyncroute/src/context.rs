use std::time::{Duration, Instant};

use http::HeaderMap;

/// Header carrying the trace ID across service boundaries.
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Per-request bookkeeping shared by every stage of one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: String,
    pub start_time: Instant,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::with_trace_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_trace_id(trace_id: String) -> Self {
        Self {
            trace_id,
            start_time: Instant::now(),
        }
    }

    /// Reuses an incoming `x-trace-id` header, or generates a fresh ID.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(TRACE_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| Self::with_trace_id(v.to_string()))
            .unwrap_or_default()
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
