//! Tracing setup and startup logging helpers.
//!
//! Request-path code logs through plain `tracing` macros with structured
//! fields (`operation`, `tenant_id`, `resource_id`). The helpers here cover
//! process startup: subscriber installation, step timing and banners.

use std::time::Instant;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("infra_api={0},tower_http={0}", config.level)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {e}");
    }
}

/// Times one startup step (store, cache, router) and logs its duration.
///
/// ```rust,ignore
/// let timer = OpTimer::new("cache", "redis connect");
/// let cache = RedisScheduleCache::connect(store, url, prefix, ttl).await;
/// timer.finish_with_result(cache.as_ref());
/// ```
#[derive(Debug)]
pub struct OpTimer {
    component: &'static str,
    operation: String,
    start: Instant,
}

impl OpTimer {
    #[must_use]
    pub fn new(component: &'static str, operation: impl Into<String>) -> Self {
        let operation = operation.into();
        tracing::debug!(component, operation = %operation, "step started");
        Self {
            component,
            operation,
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }

    pub fn finish(self) {
        tracing::info!(
            component = self.component,
            operation = %self.operation,
            duration_ms = self.elapsed_ms(),
            "step completed"
        );
    }

    /// Log success, or the error at `error!`.
    pub fn finish_with_result<T, E: std::fmt::Display>(self, result: Result<&T, &E>) {
        let duration_ms = self.elapsed_ms();
        match result {
            Ok(_) => tracing::info!(
                component = self.component,
                operation = %self.operation,
                duration_ms,
                "step completed"
            ),
            Err(e) => tracing::error!(
                component = self.component,
                operation = %self.operation,
                duration_ms,
                error = %e,
                "step failed"
            ),
        }
    }
}

/// `[step/total] name - detail`
#[macro_export]
macro_rules! log_init_step {
    ($step:expr, $total:expr, $name:expr, $detail:expr) => {
        tracing::info!(step = $step, total = $total, "[{}/{}] {} - {}", $step, $total, $name, $detail);
    };
    ($step:expr, $total:expr, $name:expr) => {
        tracing::info!(step = $step, total = $total, "[{}/{}] {}", $step, $total, $name);
    };
}

#[macro_export]
macro_rules! log_init_warning {
    ($msg:expr) => {
        tracing::warn!("⚠️  {}", $msg);
    };
    ($msg:expr, $($arg:tt)*) => {
        tracing::warn!("⚠️  {}", format!($msg, $($arg)*));
    };
}

#[macro_export]
macro_rules! log_success {
    ($msg:expr) => {
        tracing::info!("✅ {}", $msg);
    };
    ($msg:expr, $($arg:tt)*) => {
        tracing::info!("✅ {}", format!($msg, $($arg)*));
    };
}

#[macro_export]
macro_rules! log_banner {
    ($title:expr, $subtitle:expr) => {
        tracing::info!("═══════════════════════════════════════════════════");
        tracing::info!("  {}", $title);
        tracing::info!("  {}", $subtitle);
        tracing::info!("═══════════════════════════════════════════════════");
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_timer_records_step() {
        let timer = OpTimer::new("store", "in-memory inventory");
        assert_eq!(timer.component, "store");
        assert_eq!(timer.operation, "in-memory inventory");
        timer.finish();
    }

    #[test]
    fn test_op_timer_finish_with_result() {
        let ok: Result<u8, String> = Ok(1);
        OpTimer::new("cache", "connect").finish_with_result(ok.as_ref());
        let err: Result<u8, String> = Err("connection refused".into());
        OpTimer::new("cache", "connect").finish_with_result(err.as_ref());
    }

    #[test]
    fn test_init_tracing_twice_does_not_panic() {
        init_tracing(&LoggingConfig::default());
        init_tracing(&LoggingConfig {
            json: true,
            ..LoggingConfig::default()
        });
    }
}
