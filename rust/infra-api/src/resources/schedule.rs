//! External single-schedule resource.

use serde::{Deserialize, Serialize};

use super::{HostResource, RegionResource, SiteResource, Timestamps};

/// Why a schedule exists. Numbers match the wire enum and the store enum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleStatus {
    #[default]
    #[serde(rename = "SCHEDULE_STATUS_UNSPECIFIED")]
    Unspecified = 0,
    #[serde(rename = "SCHEDULE_STATUS_MAINTENANCE")]
    Maintenance = 1,
    #[serde(rename = "SCHEDULE_STATUS_OS_UPDATE")]
    OsUpdate = 3,
}

impl ScheduleStatus {
    pub fn number(self) -> i32 {
        self as i32
    }

    pub fn from_number(n: i32) -> Option<Self> {
        match n {
            0 => Some(Self::Unspecified),
            1 => Some(Self::Maintenance),
            3 => Some(Self::OsUpdate),
            _ => None,
        }
    }
}

/// A one-time maintenance or operation window.
///
/// On input only `name`, `schedule_status`, the time window and the flat
/// `target_*_id` fields are read; everything else is output-only. On output
/// the resolved target is present both as a nested object and as its flat ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleScheduleResource {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource_id: String,
    pub schedule_status: ScheduleStatus,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_site: Option<SiteResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_host: Option<HostResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_region: Option<RegionResource>,
    pub start_seconds: u32,
    /// Zero means open-ended.
    pub end_seconds: u32,
    /// Alias of `resource_id`.
    #[serde(rename = "single_scheduleID", skip_serializing_if = "String::is_empty")]
    pub single_schedule_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target_host_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target_site_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target_region_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Timestamps>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_numbers() {
        assert_eq!(ScheduleStatus::OsUpdate.number(), 3);
        assert_eq!(ScheduleStatus::from_number(1), Some(ScheduleStatus::Maintenance));
        assert_eq!(ScheduleStatus::from_number(2), None);
    }

    #[test]
    fn test_deserialize_partial_body() {
        let body = r#"{"name":"maint","schedule_status":"SCHEDULE_STATUS_MAINTENANCE","start_seconds":3600,"target_host_id":"host-87654321"}"#;
        let sched: SingleScheduleResource = serde_json::from_str(body).unwrap();
        assert_eq!(sched.schedule_status, ScheduleStatus::Maintenance);
        assert_eq!(sched.end_seconds, 0);
        assert_eq!(sched.target_host_id, "host-87654321");
        assert!(sched.target_site_id.is_empty());
    }
}
