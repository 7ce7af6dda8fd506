//! Proxy configuration
//!
//! Settings are layered: built-in defaults, then the JSON config file, then
//! `OTP_PROXY__*` environment variables. They are validated once at startup
//! and handed to the components explicitly.

use crate::auth::guard::{GuardPolicy, DEFAULT_NAMESPACE};
use crate::auth::otp::TotpVerifier;
use crate::proxy::route_table::{DuplicateRoute, RouteTable};
use crate::proxy::types::{ProxyConfig, Route, RouteName, UpstreamUrl};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default config file name
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Prefix of overriding environment variables
pub const ENV_PREFIX: &str = "OTP_PROXY";

/// Account name shown in authenticator apps when none is configured
pub const DEFAULT_USERNAME: &str = "proxy";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("No proxy_url found in the config file")]
    NoRoutes,

    #[error("Invalid route name '{name}': must be non-empty and contain no '/'")]
    InvalidRouteName { name: String },

    #[error("Invalid url '{url}' for route '{name}': must start with http:// or https://")]
    InvalidUpstreamUrl { name: String, url: String },

    #[error(transparent)]
    DuplicateRoute(#[from] DuplicateRoute),

    #[error("No pass_key found in the config file")]
    MissingPassKey,

    #[error("pass_key is not a valid base32 secret")]
    InvalidPassKey,
}

/// One entry of `proxy_url`
#[derive(Debug, Deserialize, Clone)]
pub struct ProxyUrlEntry {
    /// Informational only
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub url: String,
}

/// Connection settings for the Redis attempt store
#[derive(Debug, Deserialize, Clone)]
pub struct RedisSettings {
    #[serde(alias = "Host", default = "default_redis_host")]
    pub host: String,
    #[serde(alias = "Port", default = "default_redis_port")]
    pub port: u16,
    #[serde(alias = "Auth", default)]
    pub auth: Option<String>,
    #[serde(alias = "Db", default)]
    pub db: i64,
}

fn default_redis_host() -> String {
    "127.0.0.1".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

impl RedisSettings {
    pub fn connection_url(&self) -> String {
        match self.auth.as_deref().filter(|auth| !auth.is_empty()) {
            Some(auth) => format!(
                "redis://:{}@{}:{}/{}",
                urlencoding::encode(auth),
                self.host,
                self.port,
                self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub authenticated: bool,
    pub number_of_failed: u32,
    pub server_host: String,
    pub server_port: u16,
    pub username: String,
    #[serde(default)]
    pub pass_key: Option<String>,
    #[serde(default)]
    pub proxy_url: Vec<ProxyUrlEntry>,
    pub request_timeout_secs: u64,
    pub lockout_window_secs: u64,
    pub totp_skew: u8,
    pub store_namespace: String,
    #[serde(default)]
    pub redis: Option<RedisSettings>,
}

impl Settings {
    /// Load settings from `path` layered with environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_string_lossy().into_owned();
        Self::from_builder(
            Self::defaults()?
                .add_source(File::new(&path, FileFormat::Json).required(true))
                .add_source(Environment::with_prefix(ENV_PREFIX).separator("__")),
        )
    }

    /// Load settings from a JSON document, without environment overrides
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::from_builder(Self::defaults()?.add_source(File::from_str(json, FileFormat::Json)))
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("authenticated", false)?
            .set_default("number_of_failed", 0)?
            .set_default("server_host", "0.0.0.0")?
            .set_default("server_port", 8080)?
            .set_default("username", DEFAULT_USERNAME)?
            .set_default("request_timeout_secs", 30)?
            .set_default("lockout_window_secs", 300)?
            .set_default("totp_skew", 0)?
            .set_default("store_namespace", DEFAULT_NAMESPACE)?)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check everything that would otherwise fail later at request time
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.route_table()?;
        if self.authenticated {
            self.pass_key()?;
        }
        if let Some(pass_key) = self.pass_key.as_deref().filter(|key| !key.is_empty()) {
            if !TotpVerifier::is_valid_secret(pass_key) {
                return Err(ConfigError::InvalidPassKey);
            }
        }
        Ok(())
    }

    /// Build the route table from `proxy_url`
    pub fn route_table(&self) -> Result<RouteTable, ConfigError> {
        if self.proxy_url.is_empty() {
            return Err(ConfigError::NoRoutes);
        }

        let routes = self
            .proxy_url
            .iter()
            .map(|entry| {
                let name = RouteName::try_new(entry.name.clone()).map_err(|_| {
                    ConfigError::InvalidRouteName {
                        name: entry.name.clone(),
                    }
                })?;
                let upstream = UpstreamUrl::try_new(entry.url.clone()).map_err(|_| {
                    ConfigError::InvalidUpstreamUrl {
                        name: entry.name.clone(),
                        url: entry.url.clone(),
                    }
                })?;
                Ok(Route::new(name, upstream))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(RouteTable::new(routes)?)
    }

    /// The shared secret; required when authentication is enabled
    pub fn pass_key(&self) -> Result<&str, ConfigError> {
        self.pass_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingPassKey)
    }

    pub fn proxy_config(&self) -> ProxyConfig {
        ProxyConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn guard_policy(&self) -> GuardPolicy {
        GuardPolicy {
            failure_threshold: self.number_of_failed,
            window: Duration::from_secs(self.lockout_window_secs),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
