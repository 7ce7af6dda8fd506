//! Log message constants
//!
//! This module centralizes the log messages used by the proxy so wording
//! stays consistent between components. Messages are static; variable data
//! goes into structured tracing fields.

/// Application startup and lifecycle messages
pub mod application {
    pub const STARTING: &str = "Starting the proxy server";
    pub const LISTENING: &str = "Proxy server listening";
    pub const SHUTTING_DOWN: &str = "Shutdown signal received, draining connections";
    pub const STOPPED: &str = "Proxy server stopped";
    pub const ROUTE_REGISTERED: &str = "Route registered";
    pub const AUTH_ENABLED: &str = "One-time-code authentication enabled";
    pub const AUTH_DISABLED: &str = "Authentication disabled, all routes are open";
    pub const MEMORY_STORE: &str = "No redis configured, lockout state is kept in memory";
    pub const REDIS_CONNECTED: &str = "Connected to Redis";
    pub const SIGNAL_FAILED: &str = "Failed to listen for shutdown signal";
}

/// Authentication guard messages
pub mod auth {
    pub const LOCKED_OUT: &str = "Too many failed attempts, rejecting";
    pub const MISSING_CODE: &str = "No google code found in the header";
    pub const INVALID_CODE: &str = "Invalid google code";
    pub const CODE_REPLAYED: &str = "The google code has been used";
    pub const ADMITTED: &str = "Valid google code, forwarding";
    pub const STORE_UNAVAILABLE: &str = "Attempt store unavailable, rejecting request";
    pub const BAD_COUNTER: &str = "Ignoring non-numeric failure counter";
}

/// Request/response processing messages
pub mod request_processing {
    pub const REQUEST_RECEIVED: &str = "Incoming request";
    pub const REQUEST_COMPLETED: &str = "Request completed";
    pub const LIVENESS: &str = "Liveness probe";
    pub const FORWARDING: &str = "Forwarding to upstream";
    pub const UPSTREAM_RESPONDED: &str = "Upstream responded";
    pub const NO_ROUTE: &str = "No route for path, serving liveness page";
}

/// Error messages
pub mod errors {
    pub const UPSTREAM_CONSTRUCTION: &str = "Error creating proxy request";
    pub const UPSTREAM_TRANSPORT: &str = "Error sending proxy";
    pub const MISSING_CLIENT_ADDRESS: &str = "Peer address missing from request";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_messages_are_not_empty() {
        assert!(application::STARTING.len() > 10);
        assert!(auth::LOCKED_OUT.len() > 10);
        assert!(request_processing::REQUEST_RECEIVED.len() > 10);
        assert!(errors::UPSTREAM_TRANSPORT.len() > 10);
    }

    #[test]
    fn test_messages_have_no_format_placeholders() {
        // Constants are passed as "{}" arguments, placeholders would leak
        for message in [
            application::LISTENING,
            application::REDIS_CONNECTED,
            auth::INVALID_CODE,
            auth::ADMITTED,
            request_processing::FORWARDING,
            errors::UPSTREAM_TRANSPORT,
        ] {
            assert!(!message.contains("{}"));
        }
    }
}
