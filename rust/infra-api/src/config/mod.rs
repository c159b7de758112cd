//! Configuration management for the inventory API.
//!
//! Configuration is layered from defaults, an optional `config/infra-api`
//! file (YAML or TOML) and `INFRA__`-prefixed environment variables, then
//! validated before startup.
//!
//! # Validation
//!
//! ```rust,ignore
//! use infra_api::config::{AppConfig, ConfigValidator};
//!
//! let config = AppConfig::load_unchecked()?;
//! ConfigValidator::validate(&config)?;
//! ```

pub mod error;
pub mod validator;

pub use error::{ConfigResult, ConfigurationError};
pub use validator::ConfigValidator;

use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Gateway configuration (tenant resolution).
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Schedule API tunables.
    #[serde(default)]
    pub api: ApiConfig,
    /// Schedule cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Redis configuration.
    #[serde(default)]
    pub redis: RedisConfig,
    /// In-memory store seeding.
    #[serde(default)]
    pub inventory: InventoryConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment and config files.
    ///
    /// Sources, later ones winning:
    /// 1. Default values
    /// 2. Config file (`config/infra-api.{yaml,toml}`)
    /// 3. Environment variables (`INFRA__SECTION__KEY`)
    /// 4. `JWT_SECRET` and `REDIS_URL`
    ///
    /// After loading, the configuration is validated. Use [`Self::load_unchecked`]
    /// to skip validation.
    pub fn load() -> anyhow::Result<Self> {
        let config = Self::load_unchecked()?;

        ConfigValidator::validate(&config)
            .map_err(|e| anyhow::anyhow!("Configuration validation failed:\n\n{e}"))?;

        Ok(config)
    }

    /// Load configuration without validation.
    pub fn load_unchecked() -> anyhow::Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("cache.backend", "memory")?
            .add_source(config::File::with_name("config/infra-api").required(false))
            .add_source(
                config::Environment::with_prefix("INFRA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut app_config: AppConfig = config.try_deserialize()?;

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            app_config.gateway.jwt_secret = Some(secret);
        }
        if let Ok(url) = std::env::var("REDIS_URL") {
            app_config.redis.url = Some(url);
        }

        Ok(app_config)
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// API port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// JWT secret for token validation. When unset, the tenant header is
    /// trusted as-is.
    pub jwt_secret: Option<String>,
    /// Header carrying the tenant when no JWT is presented.
    #[serde(default = "default_tenant_header")]
    pub tenant_header: String,
}

fn default_tenant_header() -> String {
    "ActiveProjectID".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            tenant_header: default_tenant_header(),
        }
    }
}

/// Schedule API tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Page size used when a list request asks for 0.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    /// Largest page size a list request may ask for.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    /// Reject unknown PATCH field-mask paths instead of dropping them.
    #[serde(default)]
    pub strict_field_mask: bool,
}

fn default_page_size() -> u32 {
    20
}

fn default_max_page_size() -> u32 {
    100
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            strict_field_mask: false,
        }
    }
}

/// Where cached schedules live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// In-process, per replica.
    #[default]
    Memory,
    /// Shared across replicas.
    Redis,
}

impl std::fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Redis => f.write_str("redis"),
        }
    }
}

/// Schedule cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    /// Entry lifetime in seconds, for both backends.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    /// Redis key prefix.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_cache_ttl() -> u64 {
    3600 // 1 hour
}

fn default_key_prefix() -> String {
    "infra:sched".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            ttl_secs: default_cache_ttl(),
            key_prefix: default_key_prefix(),
        }
    }
}

/// Redis configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: Option<String>,
}

/// In-memory store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// File of hosts, sites and regions loaded at startup.
    pub seed_path: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to use JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
