//! Conversion between the external schedule and the store schedule.

use chrono::NaiveDateTime;
use prost_types::Timestamp;

use super::target::Target;
use super::window::TimeWindow;
use crate::error::{ApiError, ApiResult};
use crate::inventory::resources::StoreTimestamps;
use crate::inventory::validate::validate_single_schedule;
use crate::inventory::{self, Relation};
use crate::resources::{
    HostResource, RegionResource, ScheduleStatus, SingleScheduleResource, SiteResource, Timestamps,
};

/// Accepts 0 to 9 fractional digits; the store writes 3.
const STORE_TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// External → store. Fails closed on a bad target or window and runs the
/// store schema validation before returning.
pub fn to_store(external: &SingleScheduleResource) -> ApiResult<inventory::SingleScheduleResource> {
    let target = Target::from_ids(
        &external.target_host_id,
        &external.target_site_id,
        &external.target_region_id,
    )?;
    let window = TimeWindow::from_external(external.start_seconds, external.end_seconds)?;
    let schedule_status = inventory::ScheduleStatus::from_number(external.schedule_status.number())
        .ok_or_else(|| {
            ApiError::invalid_argument(format!(
                "unsupported schedule_status {}",
                external.schedule_status.number()
            ))
        })?;

    let internal = inventory::SingleScheduleResource {
        schedule_status,
        name: external.name.clone(),
        relation: target.map(Target::into_relation),
        start_seconds: window.start_seconds,
        end_seconds: window.end_seconds,
        ..inventory::SingleScheduleResource::default()
    };
    validate_single_schedule(&internal)?;
    Ok(internal)
}

/// Store → external. The resolved target is exposed both nested and as its
/// flat ID; the resource ID is also exposed under its alias.
pub fn from_store(internal: &inventory::SingleScheduleResource) -> ApiResult<SingleScheduleResource> {
    let (start_seconds, end_seconds) = TimeWindow {
        start_seconds: internal.start_seconds,
        end_seconds: internal.end_seconds,
    }
    .to_external()?;
    let schedule_status = ScheduleStatus::from_number(internal.schedule_status.number())
        .ok_or_else(|| {
            ApiError::internal(format!(
                "store returned unknown schedule_status {}",
                internal.schedule_status.number()
            ))
        })?;

    let mut external = SingleScheduleResource {
        resource_id: internal.resource_id.clone(),
        single_schedule_id: internal.resource_id.clone(),
        schedule_status,
        name: internal.name.clone(),
        start_seconds,
        end_seconds,
        timestamps: Some(paired_timestamps(internal)),
        ..SingleScheduleResource::default()
    };

    match &internal.relation {
        Some(Relation::TargetHost(host)) => {
            external.target_host_id.clone_from(&host.resource_id);
            external.target_host = Some(host_from_store(host));
        }
        Some(Relation::TargetSite(site)) => {
            external.target_site_id.clone_from(&site.resource_id);
            external.target_site = Some(site_from_store(site));
        }
        Some(Relation::TargetRegion(region)) => {
            external.target_region_id.clone_from(&region.resource_id);
            external.target_region = Some(region_from_store(region));
        }
        None => {}
    }
    Ok(external)
}

pub fn host_from_store(host: &inventory::HostResource) -> HostResource {
    HostResource {
        resource_id: host.resource_id.clone(),
        host_id: host.resource_id.clone(),
        name: host.name.clone(),
        uuid: host.uuid.clone(),
        site_id: host.site_id.clone(),
        timestamps: Some(paired_timestamps(host)),
    }
}

pub fn site_from_store(site: &inventory::SiteResource) -> SiteResource {
    SiteResource {
        resource_id: site.resource_id.clone(),
        site_id: site.resource_id.clone(),
        name: site.name.clone(),
        region_id: site.region_id.clone(),
        address: site.address.clone(),
        timestamps: Some(paired_timestamps(site)),
    }
}

pub fn region_from_store(region: &inventory::RegionResource) -> RegionResource {
    RegionResource {
        resource_id: region.resource_id.clone(),
        region_id: region.resource_id.clone(),
        name: region.name.clone(),
        parent_id: region.parent_id.clone(),
        timestamps: Some(paired_timestamps(region)),
    }
}

/// Parse the store's created/updated strings. A value that does not parse
/// becomes the Unix epoch; the read itself never fails on it.
pub fn paired_timestamps<T: StoreTimestamps + ?Sized>(resource: &T) -> Timestamps {
    Timestamps {
        created_at: Some(parse_store_timestamp(resource.created_at(), "created_at")),
        updated_at: Some(parse_store_timestamp(resource.updated_at(), "updated_at")),
    }
}

fn parse_store_timestamp(raw: &str, field: &str) -> Timestamp {
    match NaiveDateTime::parse_from_str(raw, STORE_TIMESTAMP_PARSE_FORMAT) {
        Ok(naive) => {
            let at = naive.and_utc();
            Timestamp {
                seconds: at.timestamp(),
                nanos: i32::try_from(at.timestamp_subsec_nanos()).unwrap_or_default(),
            }
        }
        Err(e) => {
            tracing::warn!(field, value = raw, error = %e, "error when parsing timestamp, continuing");
            Timestamp::default()
        }
    }
}
