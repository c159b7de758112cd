//! Shared fixtures: a journaling store wrapper and a recording cache.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use prost_types::FieldMask;

use infra_api::cache::{EventKind, ScheduleCache, ScheduleFilters, SchedulePage};
use infra_api::error::{ApiError, ApiResult};
use infra_api::inventory::{
    HostResource, InMemoryInventory, InventoryClient, ListPage, RegionResource, Resource,
    ResourceFilter, ResourceKind, SingleScheduleResource, SiteResource,
};
use infra_api::schedule::{ScheduleService, ServiceSettings};
use infra_api::tenant::{RequestContext, TenantId};

pub const HOST: &str = "host-87654321";
pub const OTHER_HOST: &str = "host-12345678";
pub const SITE: &str = "site-87654321";
pub const REGION: &str = "region-87654321";

/// Ordered log of store and cache calls, shared by the fakes.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// In-memory store that journals every call and can be told to fail writes.
pub struct JournalingStore {
    inner: InMemoryInventory,
    journal: Journal,
    fail_writes: AtomicBool,
}

impl JournalingStore {
    pub fn new(journal: Journal) -> Self {
        Self {
            inner: InMemoryInventory::new(),
            journal,
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: &str) -> ApiResult<()> {
        self.journal.lock().unwrap().push(format!("store.{call}"));
        if call != "get" && call != "list" && self.fail_writes.load(Ordering::SeqCst) {
            return Err(ApiError::Unavailable("inventory unreachable".into()));
        }
        Ok(())
    }

    pub async fn seed(&self, tenant: &str) {
        let ctx = RequestContext::with_tenant(tenant);
        for resource in [
            Resource::Region(RegionResource::stub(REGION)),
            Resource::Site(SiteResource::stub(SITE)),
            Resource::Host(HostResource::stub(HOST)),
            Resource::Host(HostResource::stub(OTHER_HOST)),
        ] {
            self.inner.create(&ctx, resource).await.unwrap();
        }
    }

    pub async fn len(&self, tenant: &str) -> usize {
        self.inner.len(tenant).await
    }
}

#[async_trait]
impl InventoryClient for JournalingStore {
    async fn create(&self, ctx: &RequestContext, resource: Resource) -> ApiResult<Resource> {
        self.record("create")?;
        self.inner.create(ctx, resource).await
    }

    async fn get(&self, ctx: &RequestContext, resource_id: &str) -> ApiResult<Resource> {
        self.record("get")?;
        self.inner.get(ctx, resource_id).await
    }

    async fn list(&self, ctx: &RequestContext, filter: &ResourceFilter) -> ApiResult<ListPage> {
        self.record("list")?;
        self.inner.list(ctx, filter).await
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        resource_id: &str,
        mask: &FieldMask,
        resource: Resource,
    ) -> ApiResult<Resource> {
        self.record("update")?;
        self.inner.update(ctx, resource_id, mask, resource).await
    }

    async fn delete(&self, ctx: &RequestContext, resource_id: &str) -> ApiResult<()> {
        self.record("delete")?;
        self.inner.delete(ctx, resource_id).await
    }
}

/// Pass-through cache that records every invalidation signal.
pub struct RecordingCache {
    store: Arc<dyn InventoryClient>,
    journal: Journal,
    pub events: Mutex<Vec<(TenantId, String, EventKind)>>,
}

impl RecordingCache {
    pub fn new(store: Arc<dyn InventoryClient>, journal: Journal) -> Self {
        Self {
            store,
            journal,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<(TenantId, String, EventKind)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScheduleCache for RecordingCache {
    async fn get_single_schedule(
        &self,
        ctx: &RequestContext,
        _tenant_id: &TenantId,
        resource_id: &str,
    ) -> ApiResult<SingleScheduleResource> {
        self.store.get(ctx, resource_id).await?.into_single_schedule()
    }

    async fn get_single_schedules(
        &self,
        ctx: &RequestContext,
        _tenant_id: &TenantId,
        offset: usize,
        limit: usize,
        filters: &ScheduleFilters,
    ) -> ApiResult<SchedulePage> {
        let page = self
            .store
            .list(
                ctx,
                &ResourceFilter {
                    kind: ResourceKind::SingleSchedule,
                    offset,
                    limit,
                    order_by: "resource_id".into(),
                    filter: filters.to_filter_expression(),
                },
            )
            .await?;
        Ok(SchedulePage {
            schedules: page
                .resources
                .into_iter()
                .map(Resource::into_single_schedule)
                .collect::<ApiResult<Vec<_>>>()?,
            has_next: page.has_next,
            total_elements: page.total_elements,
        })
    }

    async fn invalidate_cache(&self, tenant_id: &TenantId, resource_id: &str, kind: EventKind) {
        self.journal
            .lock()
            .unwrap()
            .push(format!("cache.invalidate.{kind:?}"));
        self.events
            .lock()
            .unwrap()
            .push((tenant_id.clone(), resource_id.to_owned(), kind));
    }
}

pub struct Harness {
    pub journal: Journal,
    pub store: Arc<JournalingStore>,
    pub cache: Arc<RecordingCache>,
    pub service: ScheduleService,
}

pub async fn harness(settings: ServiceSettings) -> Harness {
    let journal = Journal::default();
    let store = Arc::new(JournalingStore::new(Arc::clone(&journal)));
    store.seed("t1").await;
    store.seed("t2").await;
    let cache = Arc::new(RecordingCache::new(
        Arc::clone(&store) as Arc<dyn InventoryClient>,
        Arc::clone(&journal),
    ));
    let service = ScheduleService::new(
        Arc::clone(&store) as Arc<dyn InventoryClient>,
        Arc::clone(&cache) as Arc<dyn ScheduleCache>,
        settings,
    );
    Harness {
        journal,
        store,
        cache,
        service,
    }
}
