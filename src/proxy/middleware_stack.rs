//! Middleware stack builder
//!
//! Composes the Tower middleware applied around every route, liveness
//! included.

use crate::proxy::middleware::*;
use axum::{middleware::from_fn, Router};

/// Builder for composing the proxy middleware stack
#[derive(Clone, Debug)]
pub struct ProxyMiddlewareStack {
    enable_logging: bool,
}

impl Default for ProxyMiddlewareStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyMiddlewareStack {
    pub fn new() -> Self {
        Self {
            enable_logging: true,
        }
    }

    /// Skip per-request logging
    pub fn without_logging(mut self) -> Self {
        self.enable_logging = false;
        self
    }

    /// Apply the middleware stack to a router
    ///
    /// Outer to inner: request ID, then logging, so every log line of a
    /// request carries its ID.
    pub fn apply_to_router<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let router = if self.enable_logging {
            router.layer(from_fn(logging_middleware))
        } else {
            router
        };

        router.layer(from_fn(request_id_middleware))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::types::RequestId;
    use axum::{body::Body, extract::Request, http::StatusCode};
    use tower::ServiceExt;

    /// Answers 200 only when a request ID was attached
    async fn handler(request: Request) -> StatusCode {
        if request.extensions().get::<RequestId>().is_some() {
            StatusCode::OK
        } else {
            StatusCode::PRECONDITION_FAILED
        }
    }

    #[tokio::test]
    async fn test_middleware_stack_attaches_request_id() {
        let router = Router::new().route("/test", axum::routing::get(handler));
        let app = ProxyMiddlewareStack::new().apply_to_router(router);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stack_without_logging_still_tags_requests() {
        let router = Router::new().route("/test", axum::routing::get(handler));
        let app = ProxyMiddlewareStack::new()
            .without_logging()
            .apply_to_router(router);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
