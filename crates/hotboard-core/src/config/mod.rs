//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: `Default` implementations of every section
//! 2. **Config file**: TOML file named by the `HOTBOARD_CONFIG` env var
//!    (default `config/config.toml`, optional)
//! 3. **Environment variables**: `HOTBOARD__SECTION__FIELD` overrides single fields
//!
//! # Configuration Sections
//!
//! - [`ServerConfig`]: public HTTP listener
//! - [`StoreConfig`]: score store connection
//! - [`RankCacheConfig`]: cache backend selection and bounds
//! - [`RankingConfig`]: list length and default gallery ranking
//! - [`ScoringConfig`]: hot-score decay
//! - [`RefresherConfig`]: rebuild scheduling
//! - [`NotificationConfig`]: live connection delivery
//! - [`AdminConfig`]: maintenance API listener and token
//! - [`LoggingConfig`], [`MetricsConfig`]
//!
//! # Example
//!
//! ```toml
//! [server]
//! bind_port = 8080
//!
//! [cache]
//! backend = "redis"
//! redis_url = "redis://127.0.0.1:6379"
//!
//! [ranking]
//! top_n = 20
//!
//! [admin]
//! token = "change-me"
//! ```

use crate::{
    cache::{AdminToken, RankCacheConfig},
    metrics::MetricsConfig,
    notify::NotificationConfig,
    refresher::RefresherConfig,
    scoring::ScoringConfig,
    store::StoreConfig,
    types::RankingKind,
};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, time::Duration};

/// Public HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind to. Defaults to `127.0.0.1`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to listen on. Defaults to `3030`.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Per-request timeout for plain HTTP routes. Defaults to `30`.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}
fn default_bind_port() -> u16 {
    3030
}
fn default_request_timeout_seconds() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

/// Ranking publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Entries per published ranking, and the largest gallery page. Defaults to `10`.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Ranking served when a gallery request names none. Defaults to `hot`.
    #[serde(default)]
    pub default_kind: RankingKind,
}

fn default_top_n() -> usize {
    10
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { top_n: default_top_n(), default_kind: RankingKind::default() }
    }
}

/// Maintenance API listener.
///
/// Every admin route requires the `X-Admin-Token` header to match `token`. Without a
/// configured token the admin API rejects every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Serve the admin API. Defaults to `true`.
    #[serde(default = "default_admin_enabled")]
    pub enabled: bool,

    /// IP address to bind to. Defaults to `127.0.0.1`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to listen on. Defaults to `3031`.
    #[serde(default = "default_admin_port")]
    pub port: u16,

    /// Shared secret for `X-Admin-Token`.
    #[serde(default)]
    pub token: Option<String>,
}

fn default_admin_enabled() -> bool {
    true
}
fn default_admin_port() -> u16 {
    3031
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: default_admin_enabled(),
            bind_address: default_bind_address(),
            port: default_admin_port(),
            token: None,
        }
    }
}

impl AdminConfig {
    /// The configured token, if any non-empty one is set.
    #[must_use]
    pub fn admin_token(&self) -> Option<AdminToken> {
        self.token.clone().and_then(AdminToken::new)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset. Defaults to `"info"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub cache: RankCacheConfig,

    #[serde(default)]
    pub ranking: RankingConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub refresher: RefresherConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AppConfig {
    /// Loads defaults, then `config_path` (if it exists), then `HOTBOARD__*` overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be parsed or a value has the wrong type.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("server.bind_address", "127.0.0.1")?
            .set_default("server.bind_port", 3030)?
            .set_default("ranking.top_n", 10)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("HOTBOARD").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Loads from `HOTBOARD_CONFIG` (default `config/config.toml`) and validates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on load failure or when validation rejects a value.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("HOTBOARD_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        let config = Self::from_file(&config_path)?;
        config.validate().map_err(ConfigError::Message)?;
        Ok(config)
    }

    /// Public listener address.
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.bind_address, self.server.bind_port)
            .parse()
            .map_err(|_| {
                format!(
                    "Invalid socket address: {}:{}",
                    self.server.bind_address, self.server.bind_port
                )
            })
    }

    /// Admin listener address.
    pub fn admin_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.admin.bind_address, self.admin.port)
            .parse()
            .map_err(|_| {
                format!("Invalid admin address: {}:{}", self.admin.bind_address, self.admin.port)
            })
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_seconds)
    }

    /// Checks every section and the constraints between sections.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_port == 0 {
            return Err("Bind port must be greater than 0".to_string());
        }
        self.socket_addr()?;

        if self.server.request_timeout_seconds == 0 {
            return Err("server.request_timeout_seconds must be greater than 0".to_string());
        }

        if self.ranking.top_n == 0 {
            return Err("ranking.top_n must be greater than 0".to_string());
        }
        if self.ranking.top_n > self.cache.max_list_len {
            return Err(format!(
                "ranking.top_n ({}) exceeds cache.max_list_len ({})",
                self.ranking.top_n, self.cache.max_list_len
            ));
        }

        self.store.validate()?;
        self.cache.validate()?;
        self.scoring.validate()?;
        self.refresher.validate()?;
        self.notifications.validate()?;

        if self.admin.enabled {
            if self.admin.port == 0 {
                return Err("admin.port must be greater than 0".to_string());
            }
            self.admin_socket_addr()?;
            if self.admin.port == self.server.bind_port && self.admin.bind_address == self.server.bind_address {
                return Err("admin listener must not share the public listener address".to_string());
            }
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }
}
