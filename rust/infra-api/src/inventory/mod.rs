//! Inventory store interface and internal resource representations.
//!
//! The store is a generic resource CRUD service: create/get/list/update/delete
//! by opaque resource ID, with list filtering expressed in the string
//! [`filter`] language and partial updates expressed as a field mask over
//! internal field names. Every call is scoped to the tenant carried by the
//! [`RequestContext`].

pub mod filter;
pub mod memory;
pub mod resources;
pub mod schedule;
pub mod seed;
pub mod validate;

use async_trait::async_trait;
use prost_types::FieldMask;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::tenant::RequestContext;

pub use memory::InMemoryInventory;
pub use resources::{HostResource, RegionResource, SiteResource};
pub use schedule::{Relation, ScheduleStatus, SingleScheduleResource};
pub use seed::InventorySeed;

/// Layout of store timestamps, e.g. `2025-01-31T08:15:00.123Z`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Kinds of resource held by the store. Each kind owns an ID prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    #[default]
    SingleSchedule,
    Host,
    Site,
    Region,
}

impl ResourceKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::SingleSchedule => "singlesche",
            Self::Host => "host",
            Self::Site => "site",
            Self::Region => "region",
        }
    }

    /// Human-readable name used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::SingleSchedule => "single schedule",
            Self::Host => "host",
            Self::Site => "site",
            Self::Region => "region",
        }
    }

    /// Kind implied by a resource ID's prefix.
    pub fn from_resource_id(resource_id: &str) -> Option<Self> {
        let (prefix, _) = resource_id.split_once('-')?;
        [Self::SingleSchedule, Self::Host, Self::Site, Self::Region]
            .into_iter()
            .find(|kind| kind.prefix() == prefix)
    }
}

/// Tagged union over every entity the store holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    SingleSchedule(SingleScheduleResource),
    Host(HostResource),
    Site(SiteResource),
    Region(RegionResource),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::SingleSchedule(_) => ResourceKind::SingleSchedule,
            Self::Host(_) => ResourceKind::Host,
            Self::Site(_) => ResourceKind::Site,
            Self::Region(_) => ResourceKind::Region,
        }
    }

    pub fn resource_id(&self) -> &str {
        match self {
            Self::SingleSchedule(r) => &r.resource_id,
            Self::Host(r) => &r.resource_id,
            Self::Site(r) => &r.resource_id,
            Self::Region(r) => &r.resource_id,
        }
    }

    /// Unwrap the schedule variant. Any other variant is a store contract
    /// violation and surfaces as `Internal`.
    pub fn into_single_schedule(self) -> ApiResult<SingleScheduleResource> {
        match self {
            Self::SingleSchedule(s) => Ok(s),
            other => Err(ApiError::internal(format!(
                "expected single schedule, store returned {}",
                other.kind().label()
            ))),
        }
    }
}

/// List query.
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    pub kind: ResourceKind,
    pub offset: usize,
    /// Zero means no limit.
    pub limit: usize,
    /// Only `resource_id` ordering is supported; empty means the same.
    pub order_by: String,
    /// Boolean predicate in the filter language; empty matches everything.
    pub filter: String,
}

/// One page of a list result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    pub resources: Vec<Resource>,
    pub has_next: bool,
    pub total_elements: usize,
}

/// Tenant-scoped inventory resource store.
///
/// Implementations read the tenant from `ctx` and must never return or
/// mutate another tenant's resources.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Create a resource. The store assigns the schedule `resource_id`
    /// and the `created_at`/`updated_at` timestamps.
    async fn create(&self, ctx: &RequestContext, resource: Resource) -> ApiResult<Resource>;

    async fn get(&self, ctx: &RequestContext, resource_id: &str) -> ApiResult<Resource>;

    async fn list(&self, ctx: &RequestContext, filter: &ResourceFilter) -> ApiResult<ListPage>;

    /// Apply the fields of `resource` named by `mask` (internal field names)
    /// to the stored resource. An empty mask updates every mutable field.
    async fn update(
        &self,
        ctx: &RequestContext,
        resource_id: &str,
        mask: &FieldMask,
        resource: Resource,
    ) -> ApiResult<Resource>;

    async fn delete(&self, ctx: &RequestContext, resource_id: &str) -> ApiResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_resource_id() {
        assert_eq!(
            ResourceKind::from_resource_id("singlesche-0a1b2c3d"),
            Some(ResourceKind::SingleSchedule)
        );
        assert_eq!(
            ResourceKind::from_resource_id("region-0a1b2c3d"),
            Some(ResourceKind::Region)
        );
        assert_eq!(ResourceKind::from_resource_id("inst-0a1b2c3d"), None);
        assert_eq!(ResourceKind::from_resource_id("host"), None);
    }

    #[test]
    fn test_into_single_schedule_rejects_other_kinds() {
        let err = Resource::Host(HostResource::default())
            .into_single_schedule()
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::Internal);
    }
}
