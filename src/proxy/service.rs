//! Main proxy service implementation
//!
//! The `ProxyService` is the request dispatcher. For every inbound request it
//! resolves the route from the first path segment, runs the authentication
//! guard when one is configured, and hands the request to the forwarding
//! engine. Paths that match no route get the liveness page.
//!
//! ## Service Lifecycle
//!
//! ```rust,ignore
//! use otp_proxy::proxy::{ProxyService, ProxyConfig};
//!
//! let service = ProxyService::new(route_table, None, ProxyConfig::default());
//! let router = service.into_router();
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(
//!     listener,
//!     router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
//! )
//! .await?;
//! ```
//!
//! The client address comes from [`ConnectInfo`], so the router must be
//! served with connect info when authentication is enabled.

use crate::auth::AuthGuard;
use crate::infrastructure::log_messages::request_processing as messages;
use crate::proxy::{
    forwarder::ForwardingEngine, headers::*, middleware_stack::ProxyMiddlewareStack,
    route_table::RouteTable, types::*,
};
use axum::{
    extract::{ConnectInfo, Request, State},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// Dispatcher combining the route table, the optional guard and the
/// forwarding engine
pub struct ProxyService {
    routes: RouteTable,
    guard: Option<AuthGuard>,
    forwarder: ForwardingEngine,
}

impl ProxyService {
    /// Create a new proxy service; `guard` is `None` when authentication is
    /// disabled
    pub fn new(routes: RouteTable, guard: Option<AuthGuard>, config: ProxyConfig) -> Self {
        Self {
            routes,
            guard,
            forwarder: ForwardingEngine::new(&config),
        }
    }

    /// Create an Axum router for the proxy service with middleware
    pub fn into_router(self) -> axum::Router {
        let router = axum::Router::new()
            .route(paths::ROOT, axum::routing::get(liveness_handler))
            .fallback(proxy_handler)
            .with_state(Arc::new(self));

        ProxyMiddlewareStack::new().apply_to_router(router)
    }

    /// Run one request through route resolution, authentication and
    /// forwarding
    pub async fn dispatch(&self, request: Request) -> ProxyResult<Response> {
        let Some(route) = self.routes.resolve(request.uri().path()) else {
            debug!(path = %request.uri().path(), "{}", messages::NO_ROUTE);
            return Ok(liveness_handler().await.into_response());
        };

        if let Some(guard) = &self.guard {
            let client_ip = request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
                .ok_or(ProxyError::MissingClientAddress)?;

            // Non-ASCII values still count as a (failed) attempt
            let presented_code = request
                .headers()
                .get(X_GOOGLE_CODE)
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

            guard.authorize(client_ip, presented_code.as_deref()).await?;
        }

        self.forwarder.forward(request, route).await
    }
}

/// Axum handler for proxying requests
async fn proxy_handler(
    State(proxy): State<Arc<ProxyService>>,
    request: Request,
) -> Result<Response, ProxyError> {
    proxy.dispatch(request).await
}

/// Liveness page, also served for paths that match no route
async fn liveness_handler() -> &'static str {
    debug!("{}", messages::LIVENESS);
    LIVENESS_BODY
}
