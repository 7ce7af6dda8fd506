//! Upstream URL resolution and path handling for proxy requests

use crate::proxy::types::*;
use hyper::Uri;

/// Strategy for turning an inbound request path into the upstream URI
pub struct UrlResolver;

impl UrlResolver {
    /// First path segment after the leading slash
    ///
    /// Returns `None` for the bare root and for paths that do not start with
    /// a slash.
    pub fn first_segment(path: &str) -> Option<&str> {
        let rest = path.strip_prefix('/')?;
        let segment = rest.split('/').next().unwrap_or_default();
        (!segment.is_empty()).then_some(segment)
    }

    /// The part of `path_and_query` that follows `/<route_name>`
    ///
    /// Empty when nothing follows the route name.
    pub fn strip_route_prefix<'a>(route_name: &RouteName, path_and_query: &'a str) -> &'a str {
        path_and_query
            .strip_prefix('/')
            .and_then(|rest| rest.strip_prefix(route_name.as_ref()))
            .unwrap_or(path_and_query)
    }

    /// Resolve the final URI for the outgoing request
    ///
    /// The remainder after `/<route.name>` is appended verbatim to the
    /// upstream base URL, query string included.
    pub fn resolve_upstream_uri(route: &Route, original_uri: &Uri) -> ProxyResult<Uri> {
        let path_and_query = original_uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| original_uri.path());

        let remainder = Self::strip_route_prefix(&route.name, path_and_query);
        let upstream = format!("{}{}", route.upstream, remainder);

        upstream
            .parse()
            .map_err(|e| ProxyError::UpstreamConstruction(format!("{e}: {upstream}")))
    }
}
