//! Ordered route table mapping a path segment to an upstream

use crate::proxy::types::{Route, RouteName};
use crate::proxy::url_resolver::UrlResolver;
use std::collections::HashSet;
use thiserror::Error;

/// Two configured routes share a name
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Duplicate route name: {0}")]
pub struct DuplicateRoute(pub RouteName);

/// Immutable, ordered set of routes built once at startup
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Build a table, rejecting duplicate route names
    pub fn new(routes: Vec<Route>) -> Result<Self, DuplicateRoute> {
        let mut seen = HashSet::with_capacity(routes.len());
        for route in &routes {
            if !seen.insert(&route.name) {
                return Err(DuplicateRoute(route.name.clone()));
            }
        }
        Ok(Self { routes })
    }

    /// Find the route whose name equals the first path segment
    ///
    /// Matching is exact and case-sensitive; there is no prefix matching
    /// beyond the single segment.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        let segment = UrlResolver::first_segment(path)?;
        self.routes.iter().find(|route| {
            let name: &str = route.name.as_ref();
            name == segment
        })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
