//! Store-side schema validation.
//!
//! Runs on every schedule written to the store, after conversion and before
//! the store call, so malformed IDs and names fail with `InvalidArgument`
//! without reaching the backend.

use std::sync::OnceLock;

use regex::Regex;

use super::{ResourceKind, SingleScheduleResource};
use crate::error::{ApiError, ApiResult};
use crate::schedule::window;

const SCHEDULE_ID_PATTERN: &str = "^singlesche-[0-9a-f]{8}$";
const HOST_ID_PATTERN: &str = "^host-[0-9a-f]{8}$";
const SITE_ID_PATTERN: &str = "^site-[0-9a-f]{8}$";
const REGION_ID_PATTERN: &str = "^region-[0-9a-f]{8}$";
const NAME_PATTERN: &str = "^$|^[a-zA-Z_0-9./: -]+$";

static SCHEDULE_ID_RE: OnceLock<Regex> = OnceLock::new();
static HOST_ID_RE: OnceLock<Regex> = OnceLock::new();
static SITE_ID_RE: OnceLock<Regex> = OnceLock::new();
static REGION_ID_RE: OnceLock<Regex> = OnceLock::new();
static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> ApiResult<&'static Regex> {
    if let Some(re) = cell.get() {
        return Ok(re);
    }
    let re = Regex::new(pattern)
        .map_err(|e| ApiError::internal(format!("invalid pattern {pattern}: {e}")))?;
    Ok(cell.get_or_init(|| re))
}

fn id_regex(kind: ResourceKind) -> ApiResult<&'static Regex> {
    match kind {
        ResourceKind::SingleSchedule => compiled(&SCHEDULE_ID_RE, SCHEDULE_ID_PATTERN),
        ResourceKind::Host => compiled(&HOST_ID_RE, HOST_ID_PATTERN),
        ResourceKind::Site => compiled(&SITE_ID_RE, SITE_ID_PATTERN),
        ResourceKind::Region => compiled(&REGION_ID_RE, REGION_ID_PATTERN),
    }
}

/// Check that `resource_id` is well-formed for `kind`.
pub fn validate_resource_id(kind: ResourceKind, resource_id: &str) -> ApiResult<()> {
    if id_regex(kind)?.is_match(resource_id) {
        Ok(())
    } else {
        Err(ApiError::invalid_argument(format!(
            "invalid {} resource_id {resource_id:?}",
            kind.label()
        )))
    }
}

pub fn validate_name(name: &str) -> ApiResult<()> {
    if compiled(&NAME_RE, NAME_PATTERN)?.is_match(name) {
        Ok(())
    } else {
        Err(ApiError::invalid_argument(format!(
            "invalid name {name:?}: only letters, digits and -_./: are allowed"
        )))
    }
}

/// Full validation of a schedule as it will be written.
pub fn validate_single_schedule(schedule: &SingleScheduleResource) -> ApiResult<()> {
    if !schedule.resource_id.is_empty() {
        validate_resource_id(ResourceKind::SingleSchedule, &schedule.resource_id)?;
    }
    validate_name(&schedule.name)?;
    if let Some(relation) = &schedule.relation {
        let kind = match relation {
            super::Relation::TargetHost(_) => ResourceKind::Host,
            super::Relation::TargetSite(_) => ResourceKind::Site,
            super::Relation::TargetRegion(_) => ResourceKind::Region,
        };
        validate_resource_id(kind, relation.target_id())?;
    }
    window::check(schedule.start_seconds, schedule.end_seconds)
}
