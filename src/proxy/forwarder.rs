//! Forwarding engine: relays one request to its upstream and streams back
//! the response
//!
//! Bodies are never collected. The inbound body is handed to the client as
//! the outbound body and the upstream body becomes the response body, so
//! dropping the handler future (client gone) also drops the upstream call.
//!
//! Upstreams may be `http://` or `https://`; TLS server certificates are
//! checked against the bundled webpki roots.

use crate::infrastructure::log_messages::request_processing as messages;
use crate::proxy::headers::HOST;
use crate::proxy::types::*;
use crate::proxy::url_resolver::UrlResolver;
use axum::body::Body;
use hyper::{Request, Response, Version};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use std::error::Error as StdError;
use std::time::{Duration, Instant};
use tracing::debug;

/// Streaming forwarder shared by all requests
#[derive(Clone)]
pub struct ForwardingEngine {
    client: Client<HttpsConnector<HttpConnector>, Body>,
    request_timeout: Duration,
}

impl ForwardingEngine {
    pub fn new(config: &ProxyConfig) -> Self {
        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(hyper_util::rt::TokioExecutor::new())
            .http1_title_case_headers(true)
            .build(connector);

        Self {
            client,
            request_timeout: config.request_timeout,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Forward `request` to `route`'s upstream
    ///
    /// Method, headers (every value of multi-value headers, in order) and
    /// body are passed through; `Host` is derived from the upstream URL.
    /// The response status, headers and body are returned unchanged.
    pub async fn forward(&self, request: Request<Body>, route: &Route) -> ProxyResult<Response<Body>> {
        let start_time = Instant::now();
        let (mut parts, body) = request.into_parts();

        parts.uri = UrlResolver::resolve_upstream_uri(route, &parts.uri)?;
        parts.version = Version::HTTP_11;
        parts.headers.remove(HOST);
        parts.extensions = http::Extensions::new();

        debug!(route = %route.name, upstream = %parts.uri, method = %parts.method, "{}", messages::FORWARDING);

        let outgoing_request = Request::from_parts(parts, body);
        let response = tokio::time::timeout(self.request_timeout, self.client.request(outgoing_request))
            .await
            .map_err(|_| ProxyError::UpstreamTimeout(self.request_timeout))?
            .map_err(|e| ProxyError::UpstreamTransport(error_chain(&e)))?;

        debug!(
            route = %route.name,
            status = response.status().as_u16(),
            duration_ms = start_time.elapsed().as_millis(),
            "{}",
            messages::UPSTREAM_RESPONDED
        );

        let (response_parts, response_body) = response.into_parts();
        Ok(Response::from_parts(response_parts, Body::new(response_body)))
    }
}

/// Render an error with its sources, e.g.
/// `client error (Connect): tcp connect error: Connection refused`
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Layer(&'static str, Option<Box<Layer>>);

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl StdError for Layer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            self.1.as_deref().map(|e| e as &(dyn StdError + 'static))
        }
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let err = Layer(
            "client error (Connect)",
            Some(Box::new(Layer(
                "tcp connect error",
                Some(Box::new(Layer("Connection refused", None))),
            ))),
        );

        assert_eq!(
            error_chain(&err),
            "client error (Connect): tcp connect error: Connection refused"
        );
    }

    #[test]
    fn test_engine_uses_configured_timeout() {
        let engine = ForwardingEngine::new(&ProxyConfig {
            request_timeout: Duration::from_millis(250),
        });

        assert_eq!(engine.request_timeout(), Duration::from_millis(250));
    }
}
