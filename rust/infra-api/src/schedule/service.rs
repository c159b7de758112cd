//! Single-schedule service handlers.
//!
//! Each handler follows the same sequence: resolve the tenant from the
//! request context, convert and validate input, call the store (writes) or
//! the cache (reads), signal the cache after a successful write, and convert
//! the result back. The cache is signalled only after the store call has
//! returned success.

use std::sync::Arc;

use crate::cache::{EventKind, ScheduleCache, ScheduleFilters};
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::inventory::validate::validate_resource_id;
use crate::inventory::{InventoryClient, Resource, ResourceKind};
use crate::resources::services::{
    CreateSingleScheduleRequest, DeleteSingleScheduleRequest, DeleteSingleScheduleResponse,
    GetSingleScheduleRequest, ListSingleSchedulesRequest, ListSingleSchedulesResponse,
    PatchSingleScheduleRequest, UpdateSingleScheduleRequest,
};
use crate::resources::SingleScheduleResource;
use crate::tenant::{require_tenant, RequestContext};

use super::convert;
use super::fieldmask::{full_update_mask, translate_mask};

/// Tunables of the schedule service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Page size used when a list request asks for 0.
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// Reject unknown PATCH field-mask paths instead of dropping them.
    pub strict_field_mask: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
            strict_field_mask: false,
        }
    }
}

impl From<&ApiConfig> for ServiceSettings {
    fn from(config: &ApiConfig) -> Self {
        Self {
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
            strict_field_mask: config.strict_field_mask,
        }
    }
}

/// Log a failed step and annotate the error with the operation name.
fn fail(operation: &'static str, step: &'static str) -> impl FnOnce(ApiError) -> ApiError {
    move |err| {
        match err.code() {
            tonic::Code::InvalidArgument
            | tonic::Code::NotFound
            | tonic::Code::FailedPrecondition
            | tonic::Code::Unauthenticated => {
                tracing::warn!(operation, error = %err, "{step}");
            }
            _ => tracing::error!(operation, error = %err, "{step}"),
        }
        err.wrap(operation)
    }
}

/// Item operations only address single schedules; any other ID is rejected
/// before the cache or store sees it.
fn check_schedule_id(operation: &'static str, resource_id: &str) -> ApiResult<()> {
    validate_resource_id(ResourceKind::SingleSchedule, resource_id)
        .map_err(fail(operation, "Invalid single schedule resource ID"))
}

/// The six single-schedule operations over shared store and cache clients.
#[derive(Clone)]
pub struct ScheduleService {
    store: Arc<dyn InventoryClient>,
    cache: Arc<dyn ScheduleCache>,
    settings: ServiceSettings,
}

impl std::fmt::Debug for ScheduleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleService")
            .field("store", &"InventoryClient")
            .field("cache", &"ScheduleCache")
            .field("settings", &self.settings)
            .finish()
    }
}

impl ScheduleService {
    pub fn new(
        store: Arc<dyn InventoryClient>,
        cache: Arc<dyn ScheduleCache>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }

    pub fn settings(&self) -> ServiceSettings {
        self.settings
    }

    /// Resolve `offset`/`page_size` into store pagination.
    fn pagination(&self, offset: u32, page_size: u32) -> ApiResult<(usize, usize)> {
        let page_size = match page_size {
            0 => self.settings.default_page_size,
            n if n > self.settings.max_page_size => {
                return Err(ApiError::invalid_argument(format!(
                    "page_size {n} exceeds the maximum of {}",
                    self.settings.max_page_size
                )));
            }
            n => n,
        };
        let offset = usize::try_from(offset)
            .map_err(|e| ApiError::invalid_argument(format!("invalid offset {offset}: {e}")))?;
        let limit = usize::try_from(page_size)
            .map_err(|e| ApiError::invalid_argument(format!("invalid page_size {page_size}: {e}")))?;
        Ok((offset, limit))
    }

    pub async fn create_single_schedule(
        &self,
        ctx: &RequestContext,
        req: CreateSingleScheduleRequest,
    ) -> ApiResult<SingleScheduleResource> {
        const OP: &str = "CreateSingleSchedule";
        tracing::debug!(operation = OP, "handling request");
        let tenant_id = require_tenant(ctx, OP)?;

        let internal = convert::to_store(&req.single_schedule)
            .map_err(fail(OP, "Failed to convert to inventory single schedule"))?;

        let created = ctx
            .run(self.store.create(ctx, Resource::SingleSchedule(internal)))
            .await
            .and_then(Resource::into_single_schedule)
            .map_err(fail(OP, "Failed to create single schedule in inventory"))?;
        self.cache
            .invalidate_cache(tenant_id, &created.resource_id, EventKind::Created)
            .await;

        let out = convert::from_store(&created)
            .map_err(fail(OP, "Failed to convert from inventory single schedule"))?;
        tracing::debug!(operation = OP, tenant_id = %tenant_id, resource_id = %out.resource_id, "created");
        Ok(out)
    }

    pub async fn get_single_schedule(
        &self,
        ctx: &RequestContext,
        req: GetSingleScheduleRequest,
    ) -> ApiResult<SingleScheduleResource> {
        const OP: &str = "GetSingleSchedule";
        tracing::debug!(operation = OP, resource_id = %req.resource_id, "handling request");
        let tenant_id = require_tenant(ctx, OP)?;
        check_schedule_id(OP, &req.resource_id)?;

        let internal = ctx
            .run(self.cache.get_single_schedule(ctx, tenant_id, &req.resource_id))
            .await
            .map_err(fail(OP, "Failed to get single schedule from inventory"))?;

        let out = convert::from_store(&internal)
            .map_err(fail(OP, "Failed to convert from inventory single schedule"))?;
        tracing::debug!(operation = OP, tenant_id = %tenant_id, resource_id = %out.resource_id, "got");
        Ok(out)
    }

    pub async fn list_single_schedules(
        &self,
        ctx: &RequestContext,
        req: ListSingleSchedulesRequest,
    ) -> ApiResult<ListSingleSchedulesResponse> {
        const OP: &str = "ListSingleSchedules";
        tracing::debug!(operation = OP, "handling request");
        let tenant_id = require_tenant(ctx, OP)?;

        let filters = ScheduleFilters::parse(
            req.host_id.as_deref(),
            req.site_id.as_deref(),
            req.region_id.as_deref(),
            req.unix_epoch.as_deref(),
        )
        .map_err(fail(OP, "Failed to parse schedules filter"))?;
        let (offset, limit) = self
            .pagination(req.offset, req.page_size)
            .map_err(fail(OP, "Failed to parse pagination"))?;

        let page = ctx
            .run(
                self.cache
                    .get_single_schedules(ctx, tenant_id, offset, limit, &filters),
            )
            .await
            .map_err(fail(OP, "Failed to get single schedules from inventory"))?;

        let single_schedules = page
            .schedules
            .iter()
            .map(convert::from_store)
            .collect::<ApiResult<Vec<_>>>()
            .map_err(fail(OP, "Failed to convert from inventory single schedule"))?;
        let total_elements = i32::try_from(page.total_elements)
            .map_err(|e| ApiError::internal(format!("total elements out of range: {e}")))
            .map_err(fail(OP, "Failed to convert total elements"))?;

        tracing::debug!(
            operation = OP,
            tenant_id = %tenant_id,
            returned = single_schedules.len(),
            total_elements,
            has_next = page.has_next,
            "listed"
        );
        Ok(ListSingleSchedulesResponse {
            single_schedules,
            total_elements,
            has_next: page.has_next,
        })
    }

    /// Full replacement (PUT): every mutable field is written.
    pub async fn update_single_schedule(
        &self,
        ctx: &RequestContext,
        req: UpdateSingleScheduleRequest,
    ) -> ApiResult<SingleScheduleResource> {
        const OP: &str = "UpdateSingleSchedule";
        tracing::debug!(operation = OP, resource_id = %req.resource_id, "handling request");
        let tenant_id = require_tenant(ctx, OP)?;
        check_schedule_id(OP, &req.resource_id)?;

        let internal = convert::to_store(&req.single_schedule)
            .map_err(fail(OP, "Failed to convert to inventory single schedule"))?;
        let mask = full_update_mask();

        let updated = ctx
            .run(self.store.update(
                ctx,
                &req.resource_id,
                &mask,
                Resource::SingleSchedule(internal),
            ))
            .await
            .and_then(Resource::into_single_schedule)
            .map_err(fail(OP, "Failed to update inventory resource"))?;
        self.cache
            .invalidate_cache(tenant_id, &req.resource_id, EventKind::Updated)
            .await;

        let out = convert::from_store(&updated)
            .map_err(fail(OP, "Failed to convert from inventory single schedule"))?;
        tracing::debug!(operation = OP, tenant_id = %tenant_id, resource_id = %out.resource_id, "updated");
        Ok(out)
    }

    /// Partial update (PATCH): only the fields named by the caller's mask.
    pub async fn patch_single_schedule(
        &self,
        ctx: &RequestContext,
        req: PatchSingleScheduleRequest,
    ) -> ApiResult<SingleScheduleResource> {
        const OP: &str = "PatchSingleSchedule";
        tracing::debug!(operation = OP, resource_id = %req.resource_id, "handling request");
        let tenant_id = require_tenant(ctx, OP)?;
        check_schedule_id(OP, &req.resource_id)?;

        let internal = convert::to_store(&req.single_schedule)
            .map_err(fail(OP, "Failed to convert to inventory single schedule"))?;
        let mask = translate_mask(req.field_mask.as_ref(), self.settings.strict_field_mask)
            .map_err(fail(OP, "Failed to parse field mask"))?;

        let updated = ctx
            .run(self.store.update(
                ctx,
                &req.resource_id,
                &mask,
                Resource::SingleSchedule(internal),
            ))
            .await
            .and_then(Resource::into_single_schedule)
            .map_err(fail(OP, "Failed to update inventory resource"))?;
        self.cache
            .invalidate_cache(tenant_id, &req.resource_id, EventKind::Updated)
            .await;

        let out = convert::from_store(&updated)
            .map_err(fail(OP, "Failed to convert from inventory single schedule"))?;
        tracing::debug!(operation = OP, tenant_id = %tenant_id, resource_id = %out.resource_id, "patched");
        Ok(out)
    }

    pub async fn delete_single_schedule(
        &self,
        ctx: &RequestContext,
        req: DeleteSingleScheduleRequest,
    ) -> ApiResult<DeleteSingleScheduleResponse> {
        const OP: &str = "DeleteSingleSchedule";
        tracing::debug!(operation = OP, resource_id = %req.resource_id, "handling request");
        let tenant_id = require_tenant(ctx, OP)?;
        check_schedule_id(OP, &req.resource_id)?;

        ctx.run(self.store.delete(ctx, &req.resource_id))
            .await
            .map_err(fail(OP, "Failed to delete single schedule from inventory"))?;
        self.cache
            .invalidate_cache(tenant_id, &req.resource_id, EventKind::Deleted)
            .await;

        tracing::debug!(operation = OP, tenant_id = %tenant_id, resource_id = %req.resource_id, "deleted");
        Ok(DeleteSingleScheduleResponse {})
    }
}
