//! Per-tenant read-through cache of single schedules.
//!
//! The service reads through a [`ScheduleCache`] and signals it after every
//! successful write. Invalidation is fire-and-forget: a failed invalidation
//! is logged by the backend and never reaches the caller, and a later miss
//! repopulates from the store.

pub mod filters;
pub mod memory;
pub mod redis;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::inventory::{InventoryClient, ResourceFilter, ResourceKind, SingleScheduleResource};
use crate::tenant::{RequestContext, TenantId};

pub use filters::ScheduleFilters;
pub use memory::InMemoryScheduleCache;
pub use self::redis::RedisScheduleCache;

/// What happened to the resource being invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
}

impl EventKind {
    /// Whether the point entry for the resource must be dropped.
    /// A newly created resource cannot have one.
    pub fn drops_point_entry(self) -> bool {
        !matches!(self, Self::Created)
    }
}

/// One page of schedules as returned by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulePage {
    pub schedules: Vec<SingleScheduleResource>,
    pub has_next: bool,
    pub total_elements: usize,
}

/// Read-through cache contract consumed by the schedule service.
#[async_trait]
pub trait ScheduleCache: Send + Sync {
    /// Point lookup. Misses are loaded from the store; store errors,
    /// including not-found, propagate.
    async fn get_single_schedule(
        &self,
        ctx: &RequestContext,
        tenant_id: &TenantId,
        resource_id: &str,
    ) -> ApiResult<SingleScheduleResource>;

    /// Filtered, paginated listing ordered by resource ID.
    async fn get_single_schedules(
        &self,
        ctx: &RequestContext,
        tenant_id: &TenantId,
        offset: usize,
        limit: usize,
        filters: &ScheduleFilters,
    ) -> ApiResult<SchedulePage>;

    /// Drop whatever `kind` makes stale for `tenant_id`. Never fails.
    async fn invalidate_cache(&self, tenant_id: &TenantId, resource_id: &str, kind: EventKind);
}

/// Load a schedule from the store on a cache miss.
pub(crate) async fn load_schedule(
    store: &Arc<dyn InventoryClient>,
    ctx: &RequestContext,
    resource_id: &str,
) -> ApiResult<SingleScheduleResource> {
    store.get(ctx, resource_id).await?.into_single_schedule()
}

/// Load a page of schedules from the store on a cache miss.
pub(crate) async fn load_page(
    store: &Arc<dyn InventoryClient>,
    ctx: &RequestContext,
    offset: usize,
    limit: usize,
    filters: &ScheduleFilters,
) -> ApiResult<SchedulePage> {
    let query = ResourceFilter {
        kind: ResourceKind::SingleSchedule,
        offset,
        limit,
        order_by: "resource_id".to_owned(),
        filter: filters.to_filter_expression(),
    };
    let page = store.list(ctx, &query).await?;
    let schedules = page
        .resources
        .into_iter()
        .map(crate::inventory::Resource::into_single_schedule)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(SchedulePage {
        schedules,
        has_next: page.has_next,
        total_elements: page.total_elements,
    })
}
