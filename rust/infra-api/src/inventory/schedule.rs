//! Internal single-schedule representation.

use serde::{Deserialize, Serialize};

use super::{HostResource, RegionResource, SiteResource};

/// Store-side status enum. Numbers are shared with the external enum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    #[default]
    Unspecified = 0,
    Maintenance = 1,
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

/// The schedule's target edge. On write each variant holds an ID-only stub;
/// on read the store hydrates it to the full referenced resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    TargetHost(HostResource),
    TargetSite(SiteResource),
    TargetRegion(RegionResource),
}

impl Relation {
    pub fn target_id(&self) -> &str {
        match self {
            Self::TargetHost(h) => &h.resource_id,
            Self::TargetSite(s) => &s.resource_id,
            Self::TargetRegion(r) => &r.resource_id,
        }
    }

    /// The same edge reduced to an ID-only stub.
    #[must_use]
    pub fn stub(&self) -> Self {
        match self {
            Self::TargetHost(h) => Self::TargetHost(HostResource::stub(h.resource_id.clone())),
            Self::TargetSite(s) => Self::TargetSite(SiteResource::stub(s.resource_id.clone())),
            Self::TargetRegion(r) => {
                Self::TargetRegion(RegionResource::stub(r.resource_id.clone()))
            }
        }
    }

    /// Internal field name of the edge.
    pub fn edge(&self) -> &'static str {
        match self {
            Self::TargetHost(_) => EDGE_TARGET_HOST,
            Self::TargetSite(_) => EDGE_TARGET_SITE,
            Self::TargetRegion(_) => EDGE_TARGET_REGION,
        }
    }
}

pub const FIELD_RESOURCE_ID: &str = "resource_id";
pub const FIELD_NAME: &str = "name";
pub const FIELD_SCHEDULE_STATUS: &str = "schedule_status";
pub const FIELD_START_SECONDS: &str = "start_seconds";
pub const FIELD_END_SECONDS: &str = "end_seconds";
pub const FIELD_TENANT_ID: &str = "tenant_id";
pub const EDGE_TARGET_HOST: &str = "target_host";
pub const EDGE_TARGET_SITE: &str = "target_site";
pub const EDGE_TARGET_REGION: &str = "target_region";

/// Fields an update may touch.
pub const MUTABLE_FIELDS: [&str; 7] = [
    FIELD_NAME,
    FIELD_SCHEDULE_STATUS,
    FIELD_START_SECONDS,
    FIELD_END_SECONDS,
    EDGE_TARGET_HOST,
    EDGE_TARGET_SITE,
    EDGE_TARGET_REGION,
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleScheduleResource {
    pub resource_id: String,
    pub schedule_status: ScheduleStatus,
    pub name: String,
    pub relation: Option<Relation>,
    /// Widened from the external 32-bit value.
    pub start_seconds: u64,
    pub end_seconds: u64,
    pub tenant_id: String,
    pub created_at: String,
    pub updated_at: String,
}
