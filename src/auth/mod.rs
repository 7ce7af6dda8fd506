//! One-time-code authentication for proxied routes
//!
//! - [`guard`]: lockout, verification and replay rules
//! - [`otp`]: TOTP verification against the shared secret
//! - [`store`]: TTL key-value store holding counters and the used-code marker

pub mod guard;
pub mod otp;
pub mod store;

pub use guard::{AuthGuard, AuthRejection, GuardPolicy, StoreKeys};
pub use otp::{OtpVerifier, TotpVerifier};
pub use store::{AttemptStore, MemoryStore, StoreError};
