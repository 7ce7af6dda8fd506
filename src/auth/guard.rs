//! Authentication guard for proxied routes
//!
//! Runs, in order: lockout check, presence check, code verification, replay
//! check. The first failing step decides the rejection. All state lives in
//! the [`AttemptStore`], so several proxy processes sharing a Redis store
//! enforce the same limits.

use crate::auth::otp::OtpVerifier;
use crate::auth::store::{AttemptStore, StoreError};
use crate::infrastructure::log_messages::auth as messages;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Default lifetime of failure counters and the used-code marker
pub const DEFAULT_LOCKOUT_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Default key namespace in the store
pub const DEFAULT_NAMESPACE: &str = "proxy_with_authenticate";

/// Reason a request was not admitted
#[derive(Debug, Error)]
pub enum AuthRejection {
    #[error("Too many failed attempts, please try again later")]
    LockedOut,

    #[error("No google code found in the header")]
    MissingCode,

    #[error("Invalid google code")]
    InvalidCode,

    #[error("The google code has been used")]
    CodeReplayed,

    #[error("Authentication store unavailable")]
    StoreUnavailable(#[from] StoreError),
}

/// Lockout parameters
#[derive(Clone, Debug)]
pub struct GuardPolicy {
    /// Failures tolerated before lockout; 0 disables lockout
    pub failure_threshold: u32,
    /// TTL of failure counters and the used-code marker
    pub window: Duration,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 0,
            window: DEFAULT_LOCKOUT_WINDOW,
        }
    }
}

impl GuardPolicy {
    /// Whether `failures` exceeds the threshold
    ///
    /// Strictly greater: with a threshold of N a client is locked out once
    /// N+1 failures are on record.
    pub fn is_locked_out(&self, failures: u64) -> bool {
        self.failure_threshold != 0 && failures > u64::from(self.failure_threshold)
    }
}

/// Store key layout
#[derive(Clone, Debug)]
pub struct StoreKeys {
    namespace: String,
}

impl StoreKeys {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Failure counter of one client
    pub fn failed(&self, client_ip: &IpAddr) -> String {
        format!("{}:failed:{client_ip}", self.namespace)
    }

    /// The single, global used-code marker
    pub fn used_code(&self) -> String {
        format!("{}:otp:used", self.namespace)
    }
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

/// Admits or rejects requests based on a presented one-time code
#[derive(Clone)]
pub struct AuthGuard {
    store: Arc<dyn AttemptStore>,
    verifier: Arc<dyn OtpVerifier>,
    policy: GuardPolicy,
    keys: StoreKeys,
}

impl AuthGuard {
    pub fn new(
        store: Arc<dyn AttemptStore>,
        verifier: Arc<dyn OtpVerifier>,
        policy: GuardPolicy,
        keys: StoreKeys,
    ) -> Self {
        Self {
            store,
            verifier,
            policy,
            keys,
        }
    }

    pub fn policy(&self) -> &GuardPolicy {
        &self.policy
    }

    /// Decide on a request at the current time
    pub async fn authorize(
        &self,
        client_ip: IpAddr,
        presented_code: Option<&str>,
    ) -> Result<(), AuthRejection> {
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
        self.authorize_at(client_ip, presented_code, now).await
    }

    /// Decide on a request as if it arrived at `unix_time`
    pub async fn authorize_at(
        &self,
        client_ip: IpAddr,
        presented_code: Option<&str>,
        unix_time: u64,
    ) -> Result<(), AuthRejection> {
        let failed_key = self.keys.failed(&client_ip);

        let failures = self.failure_count(&failed_key).await?;
        if self.policy.is_locked_out(failures) {
            warn!(client_ip = %client_ip, failures, "{}", messages::LOCKED_OUT);
            return Err(AuthRejection::LockedOut);
        }

        let code = match presented_code.map(str::trim) {
            Some(code) if !code.is_empty() => code,
            _ => {
                warn!(client_ip = %client_ip, "{}", messages::MISSING_CODE);
                return Err(AuthRejection::MissingCode);
            }
        };

        if !self.verifier.verify(code, unix_time) {
            let failures = self
                .store
                .increment(&failed_key, self.policy.window)
                .await
                .map_err(|e| self.store_failure(e))?;
            warn!(client_ip = %client_ip, failures, "{}", messages::INVALID_CODE);
            return Err(AuthRejection::InvalidCode);
        }

        // Marking and the replay check are one atomic step so that two
        // concurrent requests carrying the same code cannot both pass. A
        // replay leaves the marker and its expiry untouched.
        let previous = self
            .store
            .replace_if_changed(&self.keys.used_code(), code, self.policy.window)
            .await
            .map_err(|e| self.store_failure(e))?;
        if previous.as_deref() == Some(code) {
            warn!(client_ip = %client_ip, "{}", messages::CODE_REPLAYED);
            return Err(AuthRejection::CodeReplayed);
        }

        self.store
            .delete(&failed_key)
            .await
            .map_err(|e| self.store_failure(e))?;

        info!(client_ip = %client_ip, "{}", messages::ADMITTED);
        Ok(())
    }

    async fn failure_count(&self, key: &str) -> Result<u64, AuthRejection> {
        let stored = self
            .store
            .get(key)
            .await
            .map_err(|e| self.store_failure(e))?;

        Ok(stored
            .and_then(|value| {
                value
                    .parse::<u64>()
                    .inspect_err(|_| debug!(key, value = %value, "{}", messages::BAD_COUNTER))
                    .ok()
            })
            .unwrap_or(0))
    }

    fn store_failure(&self, err: StoreError) -> AuthRejection {
        error!(error = %err, "{}", messages::STORE_UNAVAILABLE);
        AuthRejection::StoreUnavailable(err)
    }
}
