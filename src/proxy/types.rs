//! Type definitions for the proxy module

use crate::auth::AuthRejection;
use nutype::nutype;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

// ========== Route Types ==========

/// Name of a route; matched against the first path segment of a request
#[nutype(
    derive(
        Clone,
        Debug,
        Display,
        Hash,
        PartialEq,
        Eq,
        Deserialize,
        Serialize,
        TryFrom,
        AsRef
    ),
    validate(predicate = |s: &str| !s.is_empty() && !s.contains('/') && !s.contains('?')),
)]
pub struct RouteName(String);

/// Base URL of an upstream target, `http://` or `https://`
#[nutype(
    derive(Clone, Debug, Display, PartialEq, Eq, Deserialize, Serialize, TryFrom, AsRef),
    validate(predicate = |s: &str| ["http://", "https://"]
        .iter()
        .any(|scheme| s.len() > scheme.len() && s.starts_with(scheme))),
)]
pub struct UpstreamUrl(String);

/// A named mapping from a path segment to an upstream base URL
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub name: RouteName,
    pub upstream: UpstreamUrl,
}

impl Route {
    pub fn new(name: RouteName, upstream: UpstreamUrl) -> Self {
        Self { name, upstream }
    }
}

// ========== Request Types ==========

/// Request ID for log correlation
#[nutype(derive(Clone, Copy, Debug, Display, PartialEq, Eq, AsRef))]
pub struct RequestId(Uuid);

impl RequestId {
    /// Create a new RequestId backed by a v7 UUID
    pub fn generate() -> Self {
        Self::new(Uuid::now_v7())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::generate()
    }
}

// ========== Constants ==========

/// Default upstream deadline
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Proxy configuration
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    /// Deadline for a single forwarded request, until response headers arrive
    pub request_timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Errors that can end a proxied request
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error(transparent)]
    Rejected(#[from] AuthRejection),

    #[error("Error creating proxy request: {0}")]
    UpstreamConstruction(String),

    #[error("Error sending proxy: {0}")]
    UpstreamTransport(String),

    #[error("Error sending proxy: upstream did not respond within {0:?}")]
    UpstreamTimeout(Duration),

    #[error("Client address unavailable")]
    MissingClientAddress,
}

/// Result type for proxy operations
pub type ProxyResult<T> = Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_name_validation() {
        assert!(RouteName::try_new("api".to_string()).is_ok());
        assert!(RouteName::try_new("API-v2".to_string()).is_ok());

        assert!(RouteName::try_new("".to_string()).is_err());
        assert!(RouteName::try_new("a/b".to_string()).is_err());
        assert!(RouteName::try_new("a?b".to_string()).is_err());
    }

    #[test]
    fn test_upstream_url_validation() {
        assert!(UpstreamUrl::try_new("http://localhost:9000".to_string()).is_ok());
        assert!(UpstreamUrl::try_new("http://10.0.0.1/base".to_string()).is_ok());
        assert!(UpstreamUrl::try_new("https://api.example.com".to_string()).is_ok());
        assert!(UpstreamUrl::try_new("https://10.0.0.1:8443/base".to_string()).is_ok());

        assert!(UpstreamUrl::try_new("not-a-url".to_string()).is_err());
        assert!(UpstreamUrl::try_new("ftp://example.com".to_string()).is_err());
        assert!(UpstreamUrl::try_new("http://".to_string()).is_err());
        assert!(UpstreamUrl::try_new("https://".to_string()).is_err());
        assert!(UpstreamUrl::try_new("".to_string()).is_err());
    }

    #[test]
    fn test_request_id_is_v7() {
        let id = RequestId::generate();
        let uuid: &Uuid = id.as_ref();
        assert_eq!(uuid.get_version_num(), 7);
    }

    #[test]
    fn test_proxy_error_messages() {
        let err = ProxyError::UpstreamTransport("connection refused".to_string());
        assert_eq!(err.to_string(), "Error sending proxy: connection refused");

        let err = ProxyError::UpstreamConstruction("invalid uri".to_string());
        assert_eq!(err.to_string(), "Error creating proxy request: invalid uri");
    }
}
