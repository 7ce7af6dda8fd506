//! One-time password verification
//!
//! Codes follow RFC 6238 with the Google Authenticator parameters: SHA1,
//! six digits, 30 second steps.

use thiserror::Error;
use totp_rs::{Algorithm, Secret, TOTP};

/// TOTP step length in seconds
pub const TOTP_STEP: u64 = 30;

/// Number of digits in a code
pub const TOTP_DIGITS: usize = 6;

/// Issuer shown by authenticator apps
pub const DEFAULT_ISSUER: &str = "proxy_with_google_code";

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("Invalid pass key: {0}")]
    InvalidSecret(String),

    #[error("Failed to build provisioning URI: {0}")]
    Provisioning(String),
}

/// Checks presented codes against a shared secret
pub trait OtpVerifier: Send + Sync {
    /// Whether `code` is valid at `unix_time`
    fn verify(&self, code: &str, unix_time: u64) -> bool;

    /// The code for the window containing `unix_time`
    fn code_at(&self, unix_time: u64) -> String;
}

/// TOTP verifier for a base32 encoded secret
#[derive(Clone, Debug)]
pub struct TotpVerifier {
    totp: TOTP,
}

impl TotpVerifier {
    /// Build a verifier from a base32 secret
    ///
    /// `skew` is the number of extra steps accepted on either side of the
    /// current one. Secrets shorter than 128 bits are accepted since most
    /// authenticator setups use 80-bit secrets.
    pub fn new(secret: &str, skew: u8, account: &str) -> Result<Self, OtpError> {
        let secret_bytes = Secret::Encoded(secret.trim().to_uppercase())
            .to_bytes()
            .map_err(|e| OtpError::InvalidSecret(format!("{e:?}")))?;

        let totp = TOTP::new_unchecked(
            Algorithm::SHA1,
            TOTP_DIGITS,
            skew,
            TOTP_STEP,
            secret_bytes,
            Some(DEFAULT_ISSUER.to_string()),
            account.to_string(),
        );

        Ok(Self { totp })
    }

    /// Generate a fresh base32 secret
    pub fn generate_secret() -> String {
        Secret::generate_secret().to_encoded().to_string()
    }

    /// Whether `secret` decodes as base32
    pub fn is_valid_secret(secret: &str) -> bool {
        Secret::Encoded(secret.trim().to_uppercase())
            .to_bytes()
            .is_ok()
    }

    /// `otpauth://` URI for enrolling the secret in an authenticator app
    pub fn provisioning_uri(&self) -> String {
        self.totp.get_url()
    }

    /// Code for the current time
    pub fn current_code(&self) -> Result<String, OtpError> {
        self.totp
            .generate_current()
            .map_err(|e| OtpError::Provisioning(e.to_string()))
    }
}

impl OtpVerifier for TotpVerifier {
    fn verify(&self, code: &str, unix_time: u64) -> bool {
        code.len() == TOTP_DIGITS && self.totp.check(code, unix_time)
    }

    fn code_at(&self, unix_time: u64) -> String {
        self.totp.generate(unix_time)
    }
}
