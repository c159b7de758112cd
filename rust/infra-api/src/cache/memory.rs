//! In-process schedule cache.
//!
//! Point entries and list pages are kept per tenant, each with a TTL. List
//! pages are keyed by `(offset, limit, filters)` and are all dropped on any
//! write in the tenant, since a write can move a schedule across pages.
//!
//! Every invalidation bumps the tenant's generation. A miss records the
//! generation before loading from the store and only fills the cache if it
//! is unchanged, so a load that raced a write is returned but never cached.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{load_page, load_schedule, EventKind, ScheduleCache, ScheduleFilters, SchedulePage};
use crate::error::ApiResult;
use crate::inventory::{InventoryClient, SingleScheduleResource};
use crate::tenant::{RequestContext, TenantId};

#[derive(Debug, Clone)]
struct CachedEntry<T> {
    value: T,
    cached_at: Instant,
}

impl<T> CachedEntry<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            cached_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PageKey {
    offset: usize,
    limit: usize,
    filters: ScheduleFilters,
}

/// Entries held per tenant and per kind (points, pages) when no limit is given.
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

#[derive(Debug, Default)]
struct TenantEntries {
    generation: u64,
    schedules: HashMap<String, CachedEntry<SingleScheduleResource>>,
    pages: HashMap<PageKey, CachedEntry<SchedulePage>>,
}

/// Insert `value`, first dropping expired entries and, at `max_entries`,
/// the oldest one.
fn insert_bounded<K, V>(
    map: &mut HashMap<K, CachedEntry<V>>,
    key: K,
    value: V,
    ttl: Duration,
    max_entries: usize,
) where
    K: Eq + Hash + Clone,
{
    map.retain(|_, entry| !entry.is_expired(ttl));
    if map.len() >= max_entries && !map.contains_key(&key) {
        let oldest = map
            .iter()
            .min_by_key(|(_, entry)| entry.cached_at)
            .map(|(k, _)| k.clone());
        if let Some(oldest) = oldest {
            map.remove(&oldest);
        }
    }
    map.insert(key, CachedEntry::new(value));
}

/// Read-through cache over an [`InventoryClient`], held in process memory.
#[derive(Clone)]
pub struct InMemoryScheduleCache {
    store: Arc<dyn InventoryClient>,
    entries: Arc<RwLock<HashMap<String, TenantEntries>>>,
    ttl: Duration,
    max_entries: usize,
}

impl std::fmt::Debug for InMemoryScheduleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryScheduleCache")
            .field("store", &"InventoryClient")
            .field("ttl", &self.ttl)
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}

impl InMemoryScheduleCache {
    /// Create a cache with a TTL of 1 hour.
    pub fn new(store: Arc<dyn InventoryClient>) -> Self {
        Self::with_ttl(store, Duration::from_secs(3600))
    }

    pub fn with_ttl(store: Arc<dyn InventoryClient>, ttl: Duration) -> Self {
        Self {
            store,
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    /// Bound the point entries and the list pages kept per tenant.
    #[must_use]
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    async fn generation(&self, tenant_id: &TenantId) -> u64 {
        self.entries
            .read()
            .await
            .get(tenant_id.as_str())
            .map_or(0, |t| t.generation)
    }

    /// Get cache statistics for one tenant.
    pub async fn stats(&self, tenant_id: &TenantId) -> CacheStats {
        let entries = self.entries.read().await;
        entries
            .get(tenant_id.as_str())
            .map_or_else(CacheStats::default, |t| CacheStats {
                point_entries: t.schedules.len(),
                page_entries: t.pages.len(),
            })
    }

    /// Clear every tenant's entries.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Cached single schedules.
    pub point_entries: usize,
    /// Cached list pages.
    pub page_entries: usize,
}

#[async_trait]
impl ScheduleCache for InMemoryScheduleCache {
    async fn get_single_schedule(
        &self,
        ctx: &RequestContext,
        tenant_id: &TenantId,
        resource_id: &str,
    ) -> ApiResult<SingleScheduleResource> {
        {
            let entries = self.entries.read().await;
            if let Some(hit) = entries
                .get(tenant_id.as_str())
                .and_then(|t| t.schedules.get(resource_id))
                .filter(|e| !e.is_expired(self.ttl))
            {
                tracing::trace!(tenant_id = %tenant_id, resource_id, "schedule cache hit");
                return Ok(hit.value.clone());
            }
        }

        let generation = self.generation(tenant_id).await;
        let schedule = load_schedule(&self.store, ctx, resource_id).await?;

        let mut entries = self.entries.write().await;
        let tenant = entries.entry(tenant_id.as_str().to_owned()).or_default();
        if tenant.generation == generation {
            insert_bounded(
                &mut tenant.schedules,
                resource_id.to_owned(),
                schedule.clone(),
                self.ttl,
                self.max_entries,
            );
        } else {
            tracing::debug!(tenant_id = %tenant_id, resource_id, "schedule changed during load, not caching");
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
        let key = PageKey {
            offset,
            limit,
            filters: filters.clone(),
        };
        {
            let entries = self.entries.read().await;
            if let Some(hit) = entries
                .get(tenant_id.as_str())
                .and_then(|t| t.pages.get(&key))
                .filter(|e| !e.is_expired(self.ttl))
            {
                tracing::trace!(tenant_id = %tenant_id, offset, limit, "schedule page cache hit");
                return Ok(hit.value.clone());
            }
        }

        let generation = self.generation(tenant_id).await;
        let page = load_page(&self.store, ctx, offset, limit, filters).await?;

        let mut entries = self.entries.write().await;
        let tenant = entries.entry(tenant_id.as_str().to_owned()).or_default();
        if tenant.generation == generation {
            insert_bounded(&mut tenant.pages, key, page.clone(), self.ttl, self.max_entries);
        } else {
            tracing::debug!(tenant_id = %tenant_id, offset, limit, "schedules changed during load, not caching");
        }
        Ok(page)
    }

    async fn invalidate_cache(&self, tenant_id: &TenantId, resource_id: &str, kind: EventKind) {
        let mut entries = self.entries.write().await;
        let tenant = entries.entry(tenant_id.as_str().to_owned()).or_default();
        tenant.generation = tenant.generation.wrapping_add(1);
        if kind.drops_point_entry() {
            tenant.schedules.remove(resource_id);
        }
        let pages = tenant.pages.len();
        tenant.pages.clear();
        tracing::debug!(
            tenant_id = %tenant_id,
            resource_id,
            ?kind,
            generation = tenant.generation,
            pages_dropped = pages,
            "schedule cache invalidated"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use prost_types::FieldMask;
    use tokio::sync::Notify;

    use super::*;
    use crate::inventory::{InMemoryInventory, ListPage, Resource, ResourceFilter};

    /// Store whose next `get` parks after loading until `resume` fires.
    #[derive(Default)]
    struct PausingStore {
        inner: InMemoryInventory,
        armed: AtomicBool,
        loaded: Notify,
        resume: Notify,
    }

    #[async_trait]
    impl InventoryClient for PausingStore {
        async fn create(&self, ctx: &RequestContext, resource: Resource) -> ApiResult<Resource> {
            self.inner.create(ctx, resource).await
        }

        async fn get(&self, ctx: &RequestContext, resource_id: &str) -> ApiResult<Resource> {
            let loaded = self.inner.get(ctx, resource_id).await;
            if self.armed.swap(false, Ordering::SeqCst) {
                self.loaded.notify_one();
                self.resume.notified().await;
            }
            loaded
        }

        async fn list(&self, ctx: &RequestContext, filter: &ResourceFilter) -> ApiResult<ListPage> {
            self.inner.list(ctx, filter).await
        }

        async fn update(
            &self,
            ctx: &RequestContext,
            resource_id: &str,
            mask: &FieldMask,
            resource: Resource,
        ) -> ApiResult<Resource> {
            self.inner.update(ctx, resource_id, mask, resource).await
        }

        async fn delete(&self, ctx: &RequestContext, resource_id: &str) -> ApiResult<()> {
            self.inner.delete(ctx, resource_id).await
        }
    }

    fn setup() -> (Arc<InMemoryInventory>, InMemoryScheduleCache, RequestContext, TenantId) {
        let store = Arc::new(InMemoryInventory::new());
        let cache = InMemoryScheduleCache::new(Arc::clone(&store) as Arc<dyn InventoryClient>);
        let ctx = RequestContext::with_tenant("t1");
        let tenant = TenantId("t1".into());
        (store, cache, ctx, tenant)
    }

    async fn create(store: &InMemoryInventory, ctx: &RequestContext, name: &str) -> String {
        store
            .create(
                ctx,
                Resource::SingleSchedule(SingleScheduleResource {
                    name: name.into(),
                    ..SingleScheduleResource::default()
                }),
            )
            .await
            .unwrap()
            .resource_id()
            .to_owned()
    }

    #[tokio::test]
    async fn test_point_lookup_is_cached_until_invalidated() {
        let (store, cache, ctx, tenant) = setup();
        let id = create(&store, &ctx, "first").await;

        let got = cache.get_single_schedule(&ctx, &tenant, &id).await.unwrap();
        assert_eq!(got.name, "first");

        // Change the store behind the cache's back.
        store.delete(&ctx, &id).await.unwrap();
        let stale = cache.get_single_schedule(&ctx, &tenant, &id).await.unwrap();
        assert_eq!(stale.name, "first");

        cache.invalidate_cache(&tenant, &id, EventKind::Deleted).await;
        let err = cache.get_single_schedule(&ctx, &tenant, &id).await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::NotFound);
    }

    #[tokio::test]
    async fn test_created_drops_pages_only() {
        let (store, cache, ctx, tenant) = setup();
        let id = create(&store, &ctx, "first").await;
        let filters = ScheduleFilters::default();

        cache.get_single_schedule(&ctx, &tenant, &id).await.unwrap();
        let page = cache
            .get_single_schedules(&ctx, &tenant, 0, 10, &filters)
            .await
            .unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(
            cache.stats(&tenant).await,
            CacheStats {
                point_entries: 1,
                page_entries: 1
            }
        );

        let new_id = create(&store, &ctx, "second").await;
        cache.invalidate_cache(&tenant, &new_id, EventKind::Created).await;
        assert_eq!(
            cache.stats(&tenant).await,
            CacheStats {
                point_entries: 1,
                page_entries: 0
            }
        );

        let page = cache
            .get_single_schedules(&ctx, &tenant, 0, 10, &filters)
            .await
            .unwrap();
        assert_eq!(page.total_elements, 2);
    }

    #[tokio::test]
    async fn test_invalidation_is_tenant_scoped() {
        let (store, cache, ctx, tenant) = setup();
        let other_ctx = RequestContext::with_tenant("t2");
        let other = TenantId("t2".into());
        let id = create(&store, &ctx, "mine").await;
        let other_id = create(&store, &other_ctx, "theirs").await;

        cache.get_single_schedule(&ctx, &tenant, &id).await.unwrap();
        cache
            .get_single_schedule(&other_ctx, &other, &other_id)
            .await
            .unwrap();

        cache.invalidate_cache(&tenant, &id, EventKind::Updated).await;
        assert_eq!(cache.stats(&tenant).await.point_entries, 0);
        assert_eq!(cache.stats(&other).await.point_entries, 1);
    }

    #[tokio::test]
    async fn test_expired_entries_reload() {
        let store = Arc::new(InMemoryInventory::new());
        let cache = InMemoryScheduleCache::with_ttl(
            Arc::clone(&store) as Arc<dyn InventoryClient>,
            Duration::from_millis(10),
        );
        let ctx = RequestContext::with_tenant("t1");
        let tenant = TenantId("t1".into());
        let id = create(&store, &ctx, "first").await;

        cache.get_single_schedule(&ctx, &tenant, &id).await.unwrap();
        store.delete(&ctx, &id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = cache.get_single_schedule(&ctx, &tenant, &id).await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::NotFound);
    }

    #[tokio::test]
    async fn test_load_racing_a_write_is_not_cached() {
        let store = Arc::new(PausingStore::default());
        let cache = InMemoryScheduleCache::new(Arc::clone(&store) as Arc<dyn InventoryClient>);
        let ctx = RequestContext::with_tenant("t1");
        let tenant = TenantId("t1".into());
        let id = create(&store.inner, &ctx, "v1").await;

        store.armed.store(true, Ordering::SeqCst);
        let reader = {
            let cache = cache.clone();
            let (ctx, tenant, id) = (ctx.clone(), tenant.clone(), id.clone());
            tokio::spawn(async move { cache.get_single_schedule(&ctx, &tenant, &id).await })
        };
        store.loaded.notified().await;

        store
            .update(
                &ctx,
                &id,
                &FieldMask {
                    paths: vec!["name".into()],
                },
                Resource::SingleSchedule(SingleScheduleResource {
                    name: "v2".into(),
                    ..SingleScheduleResource::default()
                }),
            )
            .await
            .unwrap();
        cache.invalidate_cache(&tenant, &id, EventKind::Updated).await;
        store.resume.notify_one();

        assert_eq!(reader.await.unwrap().unwrap().name, "v1");
        assert_eq!(cache.stats(&tenant).await.point_entries, 0);
        let fresh = cache.get_single_schedule(&ctx, &tenant, &id).await.unwrap();
        assert_eq!(fresh.name, "v2");
    }

    #[tokio::test]
    async fn test_pages_are_bounded_per_tenant() {
        let (store, cache, ctx, tenant) = setup();
        let cache = cache.with_max_entries(3);
        create(&store, &ctx, "first").await;
        let filters = ScheduleFilters::default();

        for offset in 0..10 {
            cache
                .get_single_schedules(&ctx, &tenant, offset, 10, &filters)
                .await
                .unwrap();
        }
        assert_eq!(cache.stats(&tenant).await.page_entries, 3);
    }

    #[tokio::test]
    async fn test_expired_pages_are_dropped_on_insert() {
        let store = Arc::new(InMemoryInventory::new());
        let cache = InMemoryScheduleCache::with_ttl(
            Arc::clone(&store) as Arc<dyn InventoryClient>,
            Duration::from_millis(10),
        );
        let ctx = RequestContext::with_tenant("t1");
        let tenant = TenantId("t1".into());
        let filters = ScheduleFilters::default();

        for offset in 0..5 {
            cache
                .get_single_schedules(&ctx, &tenant, offset, 10, &filters)
                .await
                .unwrap();
        }
        assert_eq!(cache.stats(&tenant).await.page_entries, 5);

        tokio::time::sleep(Duration::from_millis(20)).await;
        cache
            .get_single_schedules(&ctx, &tenant, 99, 10, &filters)
            .await
            .unwrap();
        assert_eq!(cache.stats(&tenant).await.page_entries, 1);
    }
}
