//! Middleware implementations for the proxy service

use crate::infrastructure::log_messages::request_processing as messages;
use crate::proxy::headers::X_REQUEST_ID;
use crate::proxy::types::RequestId;
use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Request ID middleware - attaches an ID to every request for log correlation
///
/// A well-formed UUID in the client's `x-request-id` is adopted, otherwise a
/// fresh v7 ID is generated. The ID travels as a request extension only;
/// headers in both directions pass through untouched.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .map(RequestId::new)
        .unwrap_or_else(RequestId::generate);

    request.extensions_mut().insert(request_id);
    next.run(request).await
}

/// Logging middleware - logs request/response details with timing
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(ToString::to_string)
        .unwrap_or_else(|| "unknown".to_string());

    info!(request_id = %request_id, method = %method, path = %path, "{}", messages::REQUEST_RECEIVED);

    let response = next.run(request).await;
    let status = response.status();
    let duration_ms = start.elapsed().as_millis();

    if status.is_server_error() {
        warn!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms,
            "{}",
            messages::REQUEST_COMPLETED
        );
    } else {
        info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms,
            "{}",
            messages::REQUEST_COMPLETED
        );
    }

    response
}
