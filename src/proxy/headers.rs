//! HTTP header constants and well-known paths for the proxy service
//!
//! This module centralizes the header names and fixed paths used by the
//! dispatcher and middleware so they stay consistent.

use ::http::header;

/// Request header carrying the one-time code
pub const X_GOOGLE_CODE: &str = "x-google-code";

/// Header name for request ID used for tracing and correlation
pub const X_REQUEST_ID: &str = "x-request-id";

/// Standard header re-exports for convenience
pub use header::{HOST, SET_COOKIE};

/// Well-known paths
pub mod paths {
    /// Liveness endpoint
    pub const ROOT: &str = "/";
}

/// Body of the liveness response
pub const LIVENESS_BODY: &str = "It works!";
