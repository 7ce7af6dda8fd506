//! Error to HTTP response mapping for the proxy service
//!
//! Every error ends the request with a definite status and a short
//! plain-text reason. The mapping lives here so handlers and middleware
//! agree on it.

use crate::auth::AuthRejection;
use crate::infrastructure::log_messages::errors as messages;
use crate::proxy::types::ProxyError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

/// Extension trait for consistent error formatting
pub trait ErrorResponseExt {
    /// Get the appropriate HTTP status code
    fn status_code(&self) -> StatusCode;

    /// Plain-text body sent to the client
    fn client_message(&self) -> String;
}

impl ErrorResponseExt for AuthRejection {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthRejection::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthRejection::LockedOut
            | AuthRejection::MissingCode
            | AuthRejection::InvalidCode
            | AuthRejection::CodeReplayed => StatusCode::UNAUTHORIZED,
        }
    }

    fn client_message(&self) -> String {
        self.to_string()
    }
}

impl ErrorResponseExt for ProxyError {
    fn status_code(&self) -> StatusCode {
        use ProxyError::*;

        match self {
            Rejected(rejection) => rejection.status_code(),
            UpstreamConstruction(_) | MissingClientAddress => StatusCode::INTERNAL_SERVER_ERROR,
            UpstreamTransport(_) | UpstreamTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn client_message(&self) -> String {
        match self {
            ProxyError::Rejected(rejection) => rejection.client_message(),
            other => other.to_string(),
        }
    }
}

/// Error conversion for Axum responses
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            // The guard already logged the rejection reason
            ProxyError::Rejected(_) => {}
            ProxyError::UpstreamConstruction(e) => {
                error!(error = %e, "{}", messages::UPSTREAM_CONSTRUCTION)
            }
            ProxyError::UpstreamTransport(_) | ProxyError::UpstreamTimeout(_) => {
                error!(error = %self, "{}", messages::UPSTREAM_TRANSPORT)
            }
            ProxyError::MissingClientAddress => warn!("{}", messages::MISSING_CLIENT_ADDRESS),
        }

        (status, self.client_message()).into_response()
    }
}
