//! Request and response shapes of the single-schedule operations.

use prost_types::FieldMask;
use serde::{Deserialize, Serialize};

use super::SingleScheduleResource;

#[derive(Debug, Clone, Default)]
pub struct CreateSingleScheduleRequest {
    pub single_schedule: SingleScheduleResource,
}

#[derive(Debug, Clone, Default)]
pub struct GetSingleScheduleRequest {
    pub resource_id: String,
}

/// Listing query. Target filters are independent of each other.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListSingleSchedulesRequest {
    pub page_size: u32,
    pub offset: u32,
    pub host_id: Option<String>,
    pub site_id: Option<String>,
    pub region_id: Option<String>,
    /// Unix seconds, as a decimal string. Selects schedules active at that instant.
    pub unix_epoch: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListSingleSchedulesResponse {
    pub single_schedules: Vec<SingleScheduleResource>,
    pub total_elements: i32,
    pub has_next: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSingleScheduleRequest {
    pub resource_id: String,
    pub single_schedule: SingleScheduleResource,
}

#[derive(Debug, Clone, Default)]
pub struct PatchSingleScheduleRequest {
    pub resource_id: String,
    pub single_schedule: SingleScheduleResource,
    /// External field names (`name`, `target_host_id`, ...).
    pub field_mask: Option<FieldMask>,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteSingleScheduleRequest {
    pub resource_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteSingleScheduleResponse {}
