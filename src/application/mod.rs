//! Application wiring
//!
//! Builds the proxy service from validated settings and runs the HTTP
//! server.

pub mod app;

pub use app::Application;
