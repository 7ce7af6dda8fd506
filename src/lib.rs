//! otp_proxy - A reverse proxy guarded by one-time codes
//!
//! Requests are routed by their first path segment to a configured upstream.
//! When authentication is enabled each request must carry a current TOTP
//! code in `x-google-code`; repeated failures lock a client out and a code
//! can only be used once.

pub mod application;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod proxy;

pub use application::Application;
pub use error::{Error, Result};
