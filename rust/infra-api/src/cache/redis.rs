//! Redis-backed schedule cache, shared by every API replica.
//!
//! Key layout under the configured prefix:
//!
//! - `{prefix}:{tenant}:gen`: the tenant's generation counter
//! - `{prefix}:{tenant}:gen:{generation}:id:{resource_id}`: one schedule (JSON)
//! - `{prefix}:{tenant}:gen:{generation}:list:{offset}:{limit}:{filters}`: one page (JSON)
//!
//! Every invalidation bumps the generation, which orphans every entry of the
//! previous generation until its TTL reclaims it. A miss reads the generation
//! before loading from the store and writes under that generation, so a load
//! that raced a write lands on an orphaned key. Redis failures never fail a
//! request: reads fall back to the store and invalidation only logs.

use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{load_page, load_schedule, EventKind, ScheduleCache, ScheduleFilters, SchedulePage};
use crate::error::ApiResult;
use crate::inventory::{InventoryClient, SingleScheduleResource};
use crate::tenant::{RequestContext, TenantId};

/// Read-through cache over an [`InventoryClient`], held in Redis.
#[derive(Clone)]
pub struct RedisScheduleCache {
    store: Arc<dyn InventoryClient>,
    redis: ConnectionManager,
    key_prefix: String,
    ttl_secs: u64,
}

impl std::fmt::Debug for RedisScheduleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisScheduleCache")
            .field("store", &"InventoryClient")
            .field("key_prefix", &self.key_prefix)
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

fn point_key(prefix: &str, tenant_id: &str, generation: u64, resource_id: &str) -> String {
    format!("{prefix}:{tenant_id}:gen:{generation}:id:{resource_id}")
}

fn generation_key(prefix: &str, tenant_id: &str) -> String {
    format!("{prefix}:{tenant_id}:gen")
}

fn page_key(
    prefix: &str,
    tenant_id: &str,
    generation: u64,
    offset: usize,
    limit: usize,
    filters: &ScheduleFilters,
) -> String {
    format!(
        "{prefix}:{tenant_id}:gen:{generation}:list:{offset}:{limit}:{}",
        filters.cache_key()
    )
}

impl RedisScheduleCache {
    pub fn new(
        store: Arc<dyn InventoryClient>,
        redis: ConnectionManager,
        key_prefix: impl Into<String>,
        ttl_secs: u64,
    ) -> Self {
        Self {
            store,
            redis,
            key_prefix: key_prefix.into(),
            ttl_secs,
        }
    }

    /// Open a managed connection to `url`.
    pub async fn connect(
        store: Arc<dyn InventoryClient>,
        url: &str,
        key_prefix: impl Into<String>,
        ttl_secs: u64,
    ) -> ApiResult<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(store, manager, key_prefix, ttl_secs))
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> ApiResult<Option<T>> {
        let mut conn = self.redis.clone();
        let raw: Option<String> = conn.get(key).await?;
        Ok(raw.map(|v| serde_json::from_str(&v)).transpose()?)
    }

    async fn write<T: Serialize + Sync>(&self, key: &str, value: &T) -> ApiResult<()> {
        let mut conn = self.redis.clone();
        let payload = serde_json::to_string(value)?;
        let () = conn.set_ex(key, payload, self.ttl_secs).await?;
        Ok(())
    }

    async fn generation(&self, tenant_id: &str) -> ApiResult<u64> {
        let mut conn = self.redis.clone();
        let generation: Option<u64> = conn
            .get(generation_key(&self.key_prefix, tenant_id))
            .await?;
        Ok(generation.unwrap_or(0))
    }

    /// The tenant's current generation, or `None` when Redis cannot say.
    async fn current_generation(&self, tenant_id: &TenantId) -> Option<u64> {
        match self.generation(tenant_id.as_str()).await {
            Ok(generation) => Some(generation),
            Err(e) => {
                tracing::warn!(tenant_id = %tenant_id, error = %e, "schedule cache generation unavailable, using store");
                None
            }
        }
    }

    /// Store `value` under `key`, logging instead of failing.
    async fn fill<T: Serialize + Sync>(&self, key: &str, value: &T) {
        if let Err(e) = self.write(key, value).await {
            tracing::warn!(key, error = %e, "failed to populate schedule cache");
        }
    }
}

#[async_trait]
impl ScheduleCache for RedisScheduleCache {
    async fn get_single_schedule(
        &self,
        ctx: &RequestContext,
        tenant_id: &TenantId,
        resource_id: &str,
    ) -> ApiResult<SingleScheduleResource> {
        let key = self
            .current_generation(tenant_id)
            .await
            .map(|generation| point_key(&self.key_prefix, tenant_id.as_str(), generation, resource_id));

        if let Some(key) = &key {
            match self.read::<SingleScheduleResource>(key).await {
                Ok(Some(hit)) => {
                    tracing::trace!(tenant_id = %tenant_id, resource_id, "schedule cache hit");
                    return Ok(hit);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(key, error = %e, "schedule cache read failed, using store"),
            }
        }

        let schedule = load_schedule(&self.store, ctx, resource_id).await?;
        if let Some(key) = &key {
            self.fill(key, &schedule).await;
        }
        Ok(schedule)
    }

    async fn get_single_schedules(
        &self,
        ctx: &RequestContext,
        tenant_id: &TenantId,
        offset: usize,
        limit: usize,
        filters: &ScheduleFilters,
    ) -> ApiResult<SchedulePage> {
        let key = self.current_generation(tenant_id).await.map(|generation| {
            page_key(
                &self.key_prefix,
                tenant_id.as_str(),
                generation,
                offset,
                limit,
                filters,
            )
        });

        if let Some(key) = &key {
            match self.read::<SchedulePage>(key).await {
                Ok(Some(hit)) => return Ok(hit),
                Ok(None) => {}
                Err(e) => tracing::warn!(key, error = %e, "schedule cache read failed, using store"),
            }
        }

        let page = load_page(&self.store, ctx, offset, limit, filters).await?;
        if let Some(key) = &key {
            self.fill(key, &page).await;
        }
        Ok(page)
    }

    async fn invalidate_cache(&self, tenant_id: &TenantId, resource_id: &str, kind: EventKind) {
        let mut conn = self.redis.clone();
        let key = generation_key(&self.key_prefix, tenant_id.as_str());
        let res: RedisResult<u64> = conn.incr(&key, 1_u64).await;
        let generation = match res {
            Ok(generation) => generation,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to bump schedule cache generation");
                return;
            }
        };

        // The point entry of the previous generation is unreachable; reclaim
        // it now instead of waiting for its TTL.
        if kind.drops_point_entry() {
            let stale = point_key(
                &self.key_prefix,
                tenant_id.as_str(),
                generation.saturating_sub(1),
                resource_id,
            );
            let res: RedisResult<()> = conn.del(&stale).await;
            if let Err(e) = res {
                tracing::debug!(key = %stale, error = %e, "failed to drop cached schedule");
            }
        }

        tracing::debug!(
            tenant_id = %tenant_id,
            resource_id,
            ?kind,
            generation,
            "schedule cache invalidated"
        );
    }
}
