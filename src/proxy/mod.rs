//! Proxy module: dispatch, routing and forwarding
//!
//! A request is matched to a route by its first path segment, checked by
//! the authentication guard when one is configured, and streamed to the
//! route's upstream. Responses stream back unchanged.

pub mod error_response;
pub mod forwarder;
pub mod headers;
pub mod middleware;
pub mod middleware_stack;
pub mod route_table;
pub mod service;
pub mod types;
pub mod url_resolver;

#[cfg(test)]
mod test_utils;


pub use route_table::RouteTable;
pub use service::ProxyService;
pub use types::{ProxyConfig, ProxyError, ProxyResult, Route};
