//! Test utilities for proxy module testing
//!
//! Upstreams are real axum servers on ephemeral local ports so forwarding
//! goes over the network exactly as in production.

#[cfg(test)]
pub mod test_helpers {
    use crate::auth::{AuthGuard, GuardPolicy, MemoryStore, StoreKeys, TotpVerifier};
    use crate::proxy::route_table::RouteTable;
    use crate::proxy::service::ProxyService;
    use crate::proxy::types::*;
    use crate::proxy::headers::X_REQUEST_ID;
    use axum::{
        body::{Body, Bytes},
        extract::{ConnectInfo, Request},
        http::{header::SET_COOKIE, StatusCode},
        response::{AppendHeaders, IntoResponse},
    };
    use parking_lot::Mutex;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Secret shared by tests that exercise real TOTP codes
    pub const TEST_SECRET: &str = "JBSWY3DPEHPK3PXP";

    /// Delay of the `/slow` upstream endpoint
    pub const SLOW_RESPONSE: Duration = Duration::from_secs(2);

    /// Request ID the upstream's `/request-id` endpoint answers with
    pub const UPSTREAM_REQUEST_ID: &str = "upstream-generated-id";

    /// Pause between chunks of the streaming upstream
    pub const CHUNK_INTERVAL: Duration = Duration::from_millis(20);

    /// Address the simulated client connects from
    pub fn client_addr() -> SocketAddr {
        SocketAddr::from(([1, 2, 3, 4], 40000))
    }

    pub fn route(name: &str, url: &str) -> Route {
        Route::new(
            RouteName::try_new(name.to_string()).unwrap(),
            UpstreamUrl::try_new(url.to_string()).unwrap(),
        )
    }

    pub fn test_proxy_config() -> ProxyConfig {
        ProxyConfig {
            request_timeout: Duration::from_secs(5),
        }
    }

    /// Verifier with one window of skew so tests never straddle a boundary
    pub fn test_verifier() -> TotpVerifier {
        TotpVerifier::new(TEST_SECRET, 1, "test").unwrap()
    }

    pub fn test_guard(failure_threshold: u32) -> AuthGuard {
        AuthGuard::new(
            Arc::new(MemoryStore::new()),
            Arc::new(test_verifier()),
            GuardPolicy {
                failure_threshold,
                ..GuardPolicy::default()
            },
            StoreKeys::default(),
        )
    }

    pub fn proxy_router(
        routes: Vec<Route>,
        guard: Option<AuthGuard>,
        config: ProxyConfig,
    ) -> axum::Router {
        let table = RouteTable::new(routes).unwrap();
        ProxyService::new(table, guard, config).into_router()
    }

    /// A request as the server would see it, peer address included
    pub fn client_request(method: &str, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .extension(ConnectInfo(client_addr()))
    }

    pub async fn body_string(body: Body) -> String {
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// Echoes method, URI, headers and body as JSON
    pub async fn echo_handler(req: Request) -> Result<impl IntoResponse, StatusCode> {
        let (parts, body) = req.into_parts();
        let body_bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|_| StatusCode::BAD_REQUEST)?;

        let response_body = serde_json::json!({
            "method": parts.method.to_string(),
            "uri": parts.uri.to_string(),
            "headers": parts.headers.iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("<binary>").to_string()))
                .collect::<Vec<_>>(),
            "body": String::from_utf8_lossy(&body_bytes),
        });

        Ok((StatusCode::OK, axum::Json(response_body)))
    }

    /// Start an upstream server and return its base URL
    pub async fn spawn_upstream() -> String {
        let app = axum::Router::new()
            .route(
                "/cookies",
                axum::routing::get(|| async {
                    (
                        AppendHeaders([(SET_COOKIE, "session=abc"), (SET_COOKIE, "theme=dark")]),
                        "cookies set",
                    )
                }),
            )
            .route(
                "/status/{code}",
                axum::routing::get(
                    |axum::extract::Path(code): axum::extract::Path<u16>| async move {
                        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::OK);
                        (status, "Status response")
                    },
                ),
            )
            .route(
                "/request-id",
                axum::routing::get(|| async { ([(X_REQUEST_ID, UPSTREAM_REQUEST_ID)], "tagged") }),
            )
            .route(
                "/slow",
                axum::routing::get(|| async {
                    tokio::time::sleep(SLOW_RESPONSE).await;
                    "Slow response"
                }),
            )
            .fallback(echo_handler);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}")
    }

    /// Fires its sender when dropped
    struct NotifyOnDrop(Option<oneshot::Sender<()>>);

    impl Drop for NotifyOnDrop {
        fn drop(&mut self) {
            if let Some(tx) = self.0.take() {
                let _ = tx.send(());
            }
        }
    }

    /// Start an upstream whose single response body never ends
    ///
    /// The receiver resolves once the server has dropped that body, which
    /// only happens when the connection to it goes away.
    pub async fn spawn_streaming_upstream() -> (String, oneshot::Receiver<()>) {
        let (closed_tx, closed_rx) = oneshot::channel();
        let closed_tx = Arc::new(Mutex::new(Some(closed_tx)));

        let app = axum::Router::new().fallback(move || {
            let guard = NotifyOnDrop(closed_tx.lock().take());
            async move {
                let chunks = futures_util::stream::unfold(guard, |guard| async move {
                    tokio::time::sleep(CHUNK_INTERVAL).await;
                    Some((Ok::<_, std::io::Error>(Bytes::from_static(b"chunk\n")), guard))
                });
                Body::from_stream(chunks)
            }
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}"), closed_rx)
    }

    /// The same authority addressed with the `https` scheme
    pub fn as_https(url: &str) -> String {
        url.replacen("http://", "https://", 1)
    }

    /// URL of a local port nothing listens on
    pub async fn closed_port_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }
}
