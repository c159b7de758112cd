//! In-process inventory store.
//!
//! Keeps every tenant's resources in an ordered map keyed by resource ID, so
//! listing is naturally ordered by `resource_id`. Schedules are stored with
//! ID-only relation stubs and hydrated on the way out.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use prost_types::FieldMask;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::filter::{Expr, Filterable, Lookup, Value};
use super::schedule::{
    EDGE_TARGET_HOST, EDGE_TARGET_REGION, EDGE_TARGET_SITE, FIELD_END_SECONDS, FIELD_NAME,
    FIELD_RESOURCE_ID, FIELD_SCHEDULE_STATUS, FIELD_START_SECONDS, FIELD_TENANT_ID,
    MUTABLE_FIELDS,
};
use super::validate::{validate_resource_id, validate_single_schedule};
use super::{
    InventoryClient, ListPage, Relation, Resource, ResourceFilter, ResourceKind,
    SingleScheduleResource, TIMESTAMP_FORMAT,
};
use crate::error::{ApiError, ApiResult};
use crate::tenant::{require_tenant, RequestContext};

type TenantResources = BTreeMap<String, Resource>;

/// Tenant-partitioned in-memory implementation of [`InventoryClient`].
#[derive(Debug, Default)]
pub struct InMemoryInventory {
    tenants: RwLock<HashMap<String, TenantResources>>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resources held for `tenant_id`.
    pub async fn len(&self, tenant_id: &str) -> usize {
        self.tenants
            .read()
            .await
            .get(tenant_id)
            .map_or(0, BTreeMap::len)
    }
}

fn now_timestamp() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

fn not_found(resource_id: &str) -> ApiError {
    let label = ResourceKind::from_resource_id(resource_id).map_or("resource", ResourceKind::label);
    ApiError::not_found(format!("{label} {resource_id} not found"))
}

fn new_resource_id(store: &TenantResources, kind: ResourceKind) -> String {
    loop {
        let suffix = Uuid::new_v4().simple().to_string();
        let id = format!("{}-{}", kind.prefix(), &suffix[..8]);
        if !store.contains_key(&id) {
            return id;
        }
    }
}

/// The referenced host/site/region must exist in the same tenant.
fn ensure_target_exists(store: &TenantResources, relation: &Relation) -> ApiResult<()> {
    let id = relation.target_id();
    let found = match (relation, store.get(id)) {
        (Relation::TargetHost(_), Some(Resource::Host(_)))
        | (Relation::TargetSite(_), Some(Resource::Site(_)))
        | (Relation::TargetRegion(_), Some(Resource::Region(_))) => true,
        _ => false,
    };
    if found { Ok(()) } else { Err(not_found(id)) }
}

/// Expand a relation stub to the stored resource. Dangling stubs stay stubs.
fn hydrate(store: &TenantResources, schedule: &SingleScheduleResource) -> SingleScheduleResource {
    let mut out = schedule.clone();
    out.relation = schedule.relation.as_ref().map(|relation| {
        match (relation, store.get(relation.target_id())) {
            (Relation::TargetHost(_), Some(Resource::Host(h))) => Relation::TargetHost(h.clone()),
            (Relation::TargetSite(_), Some(Resource::Site(s))) => Relation::TargetSite(s.clone()),
            (Relation::TargetRegion(_), Some(Resource::Region(r))) => {
                Relation::TargetRegion(r.clone())
            }
            _ => relation.clone(),
        }
    });
    out
}

/// First schedule whose relation points at `target_id`, if any.
fn referencing_schedule<'a>(store: &'a TenantResources, target_id: &str) -> Option<&'a str> {
    store.values().find_map(|resource| match resource {
        Resource::SingleSchedule(s)
            if s.relation.as_ref().is_some_and(|r| r.target_id() == target_id) =>
        {
            Some(s.resource_id.as_str())
        }
        _ => None,
    })
}

fn hydrate_resource(store: &TenantResources, resource: &Resource) -> Resource {
    match resource {
        Resource::SingleSchedule(s) => Resource::SingleSchedule(hydrate(store, s)),
        other => other.clone(),
    }
}

/// Copy the masked fields of `incoming` onto `current`.
///
/// An edge path whose variant is absent from `incoming` clears that edge
/// when it is the current relation.
fn apply_schedule_mask(
    mut current: SingleScheduleResource,
    incoming: &SingleScheduleResource,
    mask: &FieldMask,
) -> ApiResult<SingleScheduleResource> {
    let paths: Vec<&str> = if mask.paths.is_empty() {
        MUTABLE_FIELDS.to_vec()
    } else {
        mask.paths.iter().map(String::as_str).collect()
    };

    for path in paths {
        match path {
            FIELD_NAME => current.name.clone_from(&incoming.name),
            FIELD_SCHEDULE_STATUS => current.schedule_status = incoming.schedule_status,
            FIELD_START_SECONDS => current.start_seconds = incoming.start_seconds,
            FIELD_END_SECONDS => current.end_seconds = incoming.end_seconds,
            EDGE_TARGET_HOST | EDGE_TARGET_SITE | EDGE_TARGET_REGION => {
                match &incoming.relation {
                    Some(relation) if relation.edge() == path => {
                        current.relation = Some(relation.stub());
                    }
                    _ => {
                        if current.relation.as_ref().is_some_and(|r| r.edge() == path) {
                            current.relation = None;
                        }
                    }
                }
            }
            other => {
                return Err(ApiError::invalid_argument(format!(
                    "field mask path {other:?} is not an updatable single schedule field"
                )));
            }
        }
    }
    Ok(current)
}

fn edge_lookup(relation: Option<&Relation>, edge: &str) -> Lookup {
    match relation {
        Some(r) if r.edge() == edge => Lookup::Value(Value::Str(r.target_id().to_owned())),
        _ => Lookup::Unset,
    }
}

fn str_value(s: &str) -> Lookup {
    Lookup::Value(Value::Str(s.to_owned()))
}

impl Filterable for Resource {
    fn lookup(&self, path: &str) -> Lookup {
        match self {
            Resource::SingleSchedule(s) => match path {
                FIELD_RESOURCE_ID => str_value(&s.resource_id),
                FIELD_NAME => str_value(&s.name),
                FIELD_TENANT_ID => str_value(&s.tenant_id),
                FIELD_SCHEDULE_STATUS => {
                    Lookup::Value(Value::Uint(u64::from(s.schedule_status.number().unsigned_abs())))
                }
                FIELD_START_SECONDS => Lookup::Value(Value::Uint(s.start_seconds)),
                FIELD_END_SECONDS => Lookup::Value(Value::Uint(s.end_seconds)),
                "created_at" => str_value(&s.created_at),
                "updated_at" => str_value(&s.updated_at),
                _ => {
                    let (edge, field) = path.split_once('.').unwrap_or((path, FIELD_RESOURCE_ID));
                    if field != FIELD_RESOURCE_ID
                        || ![EDGE_TARGET_HOST, EDGE_TARGET_SITE, EDGE_TARGET_REGION].contains(&edge)
                    {
                        return Lookup::Unknown;
                    }
                    edge_lookup(s.relation.as_ref(), edge)
                }
            },
            Resource::Host(h) => match path {
                FIELD_RESOURCE_ID => str_value(&h.resource_id),
                FIELD_NAME => str_value(&h.name),
                "uuid" => str_value(&h.uuid),
                "site_id" => str_value(&h.site_id),
                FIELD_TENANT_ID => str_value(&h.tenant_id),
                _ => Lookup::Unknown,
            },
            Resource::Site(s) => match path {
                FIELD_RESOURCE_ID => str_value(&s.resource_id),
                FIELD_NAME => str_value(&s.name),
                "region_id" => str_value(&s.region_id),
                "address" => str_value(&s.address),
                FIELD_TENANT_ID => str_value(&s.tenant_id),
                _ => Lookup::Unknown,
            },
            Resource::Region(r) => match path {
                FIELD_RESOURCE_ID => str_value(&r.resource_id),
                FIELD_NAME => str_value(&r.name),
                "parent_id" => str_value(&r.parent_id),
                FIELD_TENANT_ID => str_value(&r.tenant_id),
                _ => Lookup::Unknown,
            },
        }
    }
}

/// Assign (or accept) the ID and stamp tenant and timestamps.
fn prepare_create(
    store: &TenantResources,
    tenant_id: &str,
    resource: Resource,
) -> ApiResult<Resource> {
    let kind = resource.kind();
    let now = now_timestamp();

    // Only schedules always get a store-assigned ID; referenced resources
    // may be seeded with a caller-chosen one.
    let resource_id = match (&resource, resource.resource_id()) {
        (Resource::SingleSchedule(_), _) | (_, "") => new_resource_id(store, kind),
        (_, id) => {
            validate_resource_id(kind, id)?;
            if store.contains_key(id) {
                return Err(ApiError::invalid_argument(format!(
                    "{} {id} already exists",
                    kind.label()
                )));
            }
            id.to_owned()
        }
    };

    macro_rules! stamp {
        ($r:ident) => {{
            $r.resource_id = resource_id;
            $r.tenant_id = tenant_id.to_owned();
            $r.created_at.clone_from(&now);
            $r.updated_at = now;
        }};
    }

    Ok(match resource {
        Resource::SingleSchedule(mut s) => {
            s.relation = s.relation.as_ref().map(Relation::stub);
            if let Some(relation) = &s.relation {
                ensure_target_exists(store, relation)?;
            }
            stamp!(s);
            validate_single_schedule(&s)?;
            Resource::SingleSchedule(s)
        }
        Resource::Host(mut h) => {
            stamp!(h);
            Resource::Host(h)
        }
        Resource::Site(mut s) => {
            stamp!(s);
            Resource::Site(s)
        }
        Resource::Region(mut r) => {
            stamp!(r);
            Resource::Region(r)
        }
    })
}

#[async_trait]
impl InventoryClient for InMemoryInventory {
    async fn create(&self, ctx: &RequestContext, resource: Resource) -> ApiResult<Resource> {
        ctx.check()?;
        let tenant_id = require_tenant(ctx, "inventory.create")?;
        let mut tenants = self.tenants.write().await;
        let store = tenants.entry(tenant_id.as_str().to_owned()).or_default();

        let created = prepare_create(store, tenant_id.as_str(), resource)?;
        let id = created.resource_id().to_owned();
        store.insert(id.clone(), created.clone());
        tracing::debug!(tenant_id = %tenant_id, resource_id = %id, "inventory resource created");
        Ok(hydrate_resource(store, &created))
    }

    async fn get(&self, ctx: &RequestContext, resource_id: &str) -> ApiResult<Resource> {
        ctx.check()?;
        let tenant_id = require_tenant(ctx, "inventory.get")?;
        let tenants = self.tenants.read().await;
        let store = tenants
            .get(tenant_id.as_str())
            .ok_or_else(|| not_found(resource_id))?;
        store
            .get(resource_id)
            .map(|r| hydrate_resource(store, r))
            .ok_or_else(|| not_found(resource_id))
    }

    async fn list(&self, ctx: &RequestContext, filter: &ResourceFilter) -> ApiResult<ListPage> {
        ctx.check()?;
        let tenant_id = require_tenant(ctx, "inventory.list")?;
        if !filter.order_by.is_empty() && filter.order_by != FIELD_RESOURCE_ID {
            return Err(ApiError::invalid_argument(format!(
                "unsupported order_by {:?}",
                filter.order_by
            )));
        }
        let expr = Expr::parse(&filter.filter)?;

        let tenants = self.tenants.read().await;
        let Some(store) = tenants.get(tenant_id.as_str()) else {
            return Ok(ListPage::default());
        };

        let mut matched = Vec::new();
        for resource in store.values().filter(|r| r.kind() == filter.kind) {
            if expr.matches(resource)? {
                matched.push(resource);
            }
        }

        let total_elements = matched.len();
        let limit = if filter.limit == 0 { total_elements } else { filter.limit };
        let resources: Vec<Resource> = matched
            .into_iter()
            .skip(filter.offset)
            .take(limit)
            .map(|r| hydrate_resource(store, r))
            .collect();
        let has_next = filter.offset.saturating_add(resources.len()) < total_elements;

        Ok(ListPage {
            resources,
            has_next,
            total_elements,
        })
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        resource_id: &str,
        mask: &FieldMask,
        resource: Resource,
    ) -> ApiResult<Resource> {
        ctx.check()?;
        let tenant_id = require_tenant(ctx, "inventory.update")?;
        let mut tenants = self.tenants.write().await;
        let store = tenants
            .get_mut(tenant_id.as_str())
            .ok_or_else(|| not_found(resource_id))?;
        let current = store
            .get(resource_id)
            .cloned()
            .ok_or_else(|| not_found(resource_id))?;

        let (Resource::SingleSchedule(current), Resource::SingleSchedule(incoming)) =
            (current, &resource)
        else {
            return Err(ApiError::invalid_argument(format!(
                "update of {} {resource_id} with a {} is not supported",
                ResourceKind::from_resource_id(resource_id).map_or("resource", ResourceKind::label),
                resource.kind().label()
            )));
        };

        let previous_relation = current.relation.clone();
        let mut updated = apply_schedule_mask(current, incoming, mask)?;
        if updated.relation != previous_relation {
            if let Some(relation) = &updated.relation {
                ensure_target_exists(store, relation)?;
            }
        }
        validate_single_schedule(&updated)?;
        updated.updated_at = now_timestamp();

        store.insert(
            resource_id.to_owned(),
            Resource::SingleSchedule(updated.clone()),
        );
        tracing::debug!(tenant_id = %tenant_id, resource_id, "inventory resource updated");
        Ok(Resource::SingleSchedule(hydrate(store, &updated)))
    }

    async fn delete(&self, ctx: &RequestContext, resource_id: &str) -> ApiResult<()> {
        ctx.check()?;
        let tenant_id = require_tenant(ctx, "inventory.delete")?;
        let mut tenants = self.tenants.write().await;
        let store = tenants
            .get_mut(tenant_id.as_str())
            .filter(|store| store.contains_key(resource_id))
            .ok_or_else(|| not_found(resource_id))?;
        if let Some(schedule_id) = referencing_schedule(store, resource_id) {
            return Err(ApiError::failed_precondition(format!(
                "{resource_id} is still targeted by single schedule {schedule_id}"
            )));
        }
        store.remove(resource_id);
        tracing::debug!(tenant_id = %tenant_id, resource_id, "inventory resource deleted");
        Ok(())
    }
}
