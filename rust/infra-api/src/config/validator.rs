//! Configuration validation, run once at startup.
//!
//! Every rule is checked and all failures are reported together.

use super::error::{ConfigResult, ConfigurationError};
use super::{AppConfig, CacheBackend};

/// Checks configuration values and combinations.
///
/// | Rule                                   | Error              |
/// |----------------------------------------|--------------------|
/// | `cache.backend = redis`, no `redis.url`| `MissingRequired`  |
/// | `api.default_page_size` = 0            | `Invalid`          |
/// | `default_page_size > max_page_size`    | `Incompatible`     |
/// | `server.port` = 0                      | `Invalid`          |
#[derive(Debug)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the entire application configuration.
    pub fn validate(config: &AppConfig) -> ConfigResult<()> {
        let mut errors = Vec::new();

        for check in [
            Self::validate_cache(config),
            Self::validate_pagination(config),
            Self::validate_server(config),
        ] {
            match check {
                Ok(()) => {}
                Err(ConfigurationError::Multiple(errs)) => errors.extend(errs),
                Err(e) => errors.push(e),
            }
        }

        ConfigurationError::collect(errors)
    }

    pub fn validate_cache(config: &AppConfig) -> ConfigResult<()> {
        if config.cache.backend == CacheBackend::Redis
            && config.redis.url.as_deref().is_none_or(str::is_empty)
        {
            return Err(ConfigurationError::missing_required(
                "redis.url",
                "the Redis schedule cache (cache.backend = redis)",
                "REDIS_URL or INFRA__REDIS__URL",
            ));
        }
        if config.cache.key_prefix.is_empty() {
            return Err(ConfigurationError::invalid(
                "cache.key_prefix is empty",
                "Set INFRA__CACHE__KEY_PREFIX, e.g. infra:sched",
            ));
        }
        Ok(())
    }

    pub fn validate_pagination(config: &AppConfig) -> ConfigResult<()> {
        let api = &config.api;
        let mut errors = Vec::new();
        if api.default_page_size == 0 {
            errors.push(ConfigurationError::invalid(
                "api.default_page_size is 0",
                "Set INFRA__API__DEFAULT_PAGE_SIZE to at least 1",
            ));
        }
        if api.default_page_size > api.max_page_size {
            errors.push(ConfigurationError::incompatible(
                format!("api.default_page_size={}", api.default_page_size),
                format!("api.max_page_size={}", api.max_page_size),
                "The default page size must not exceed the maximum page size.",
            ));
        }
        ConfigurationError::collect(errors)
    }

    pub fn validate_server(config: &AppConfig) -> ConfigResult<()> {
        if config.server.port == 0 {
            return Err(ConfigurationError::invalid(
                "server.port is 0",
                "Set INFRA__SERVER__PORT or pass --port",
            ));
        }
        Ok(())
    }
}
