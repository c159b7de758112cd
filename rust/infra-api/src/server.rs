//! HTTP server setup and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::cache::{InMemoryScheduleCache, RedisScheduleCache, ScheduleCache};
use crate::config::{AppConfig, CacheBackend, ConfigurationError};
use crate::gateway;
use crate::inventory::{InMemoryInventory, InventoryClient, InventorySeed};
use crate::logging::OpTimer;
use crate::schedule::{ScheduleService, ServiceSettings};
use crate::{log_banner, log_init_step, log_init_warning, log_success, AppState};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the store, cache and service, then the router.
pub async fn create_app(config: AppConfig) -> anyhow::Result<Router> {
    let overall_timer = OpTimer::new("server", "create_app");

    log_banner!(
        format!("Inventory API v{VERSION}"),
        format!("Schedule cache: {}", config.cache.backend)
    );

    // [1/4] Inventory store
    let step_timer = OpTimer::new("server", "inventory");
    let inventory = Arc::new(InMemoryInventory::new());
    match config.inventory.seed_path.as_deref() {
        Some(path) => {
            let created = InventorySeed::from_file(path)?.apply(&inventory).await?;
            log_init_step!(1, 4, "Inventory", format!("in-memory, {created} resources seeded from {path}"));
        }
        None => {
            log_init_step!(1, 4, "Inventory", "in-memory, empty");
            log_init_warning!("No inventory.seed_path configured; targeted schedules will fail with NotFound");
        }
    }
    let store: Arc<dyn InventoryClient> = inventory;
    step_timer.finish();

    // [2/4] Schedule cache
    let step_timer = OpTimer::new("server", "schedule_cache");
    let cache = create_cache(&config, Arc::clone(&store)).await;
    step_timer.finish_with_result(cache.as_ref());
    let cache = cache?;

    // [3/4] Schedule service
    let schedules = ScheduleService::new(store, cache, ServiceSettings::from(&config.api));
    log_init_step!(
        3,
        4,
        "Schedule Service",
        format!(
            "page size {}/{}, strict field mask {}",
            config.api.default_page_size, config.api.max_page_size, config.api.strict_field_mask
        )
    );

    let state = AppState {
        config: Arc::new(config),
        schedules,
    };

    // [4/4] Router
    let step_timer = OpTimer::new("server", "router");
    let app = router(state);
    log_init_step!(4, 4, "Router", "routes + middleware configured");
    step_timer.finish();

    overall_timer.finish();
    log_success!("Inventory API server created successfully");
    Ok(app)
}

/// Routes and middleware over an assembled state.
pub fn router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.timeout_secs);
    gateway::create_router()
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::GATEWAY_TIMEOUT,
            timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            gateway::auth::tenant_middleware,
        ))
        .with_state(state)
}

async fn create_cache(
    config: &AppConfig,
    store: Arc<dyn InventoryClient>,
) -> Result<Arc<dyn ScheduleCache>, ConfigurationError> {
    let ttl_secs = config.cache.ttl_secs;
    match config.cache.backend {
        CacheBackend::Memory => {
            log_init_step!(2, 4, "Schedule Cache", format!("in-process, ttl {ttl_secs}s"));
            Ok(Arc::new(InMemoryScheduleCache::with_ttl(
                store,
                Duration::from_secs(ttl_secs),
            )))
        }
        CacheBackend::Redis => {
            let url = config.redis.url.as_deref().ok_or_else(|| {
                ConfigurationError::missing_required(
                    "redis.url",
                    "the Redis schedule cache (cache.backend = redis)",
                    "REDIS_URL or INFRA__REDIS__URL",
                )
            })?;
            let cache = RedisScheduleCache::connect(store, url, &config.cache.key_prefix, ttl_secs)
                .await
                .map_err(|e| {
                    ConfigurationError::connection_failed(
                        "Redis",
                        url,
                        e.to_string(),
                        "Ensure Redis is running and reachable, or set INFRA__CACHE__BACKEND=memory",
                    )
                })?;
            log_init_step!(2, 4, "Schedule Cache", format!("redis {url}, ttl {ttl_secs}s"));
            Ok(Arc::new(cache))
        }
    }
}
