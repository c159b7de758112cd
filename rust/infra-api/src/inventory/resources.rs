//! Internal host and location resources referenced by schedules.

use serde::{Deserialize, Serialize};

/// Store-format timestamp pair carried by every stored resource.
///
/// Values are strings in `YYYY-MM-DDTHH:MM:SS.sssZ` form.
pub trait StoreTimestamps {
    fn created_at(&self) -> &str;
    fn updated_at(&self) -> &str;
}

macro_rules! impl_store_timestamps {
    ($($ty:ty),+ $(,)?) => {
        $(impl StoreTimestamps for $ty {
            fn created_at(&self) -> &str {
                &self.created_at
            }

            fn updated_at(&self) -> &str {
                &self.updated_at
            }
        })+
    };
}

impl_store_timestamps!(
    HostResource,
    SiteResource,
    RegionResource,
    super::SingleScheduleResource,
);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostResource {
    pub resource_id: String,
    pub name: String,
    pub uuid: String,
    pub site_id: String,
    pub tenant_id: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteResource {
    pub resource_id: String,
    pub name: String,
    pub region_id: String,
    pub address: String,
    pub tenant_id: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionResource {
    pub resource_id: String,
    pub name: String,
    pub parent_id: String,
    pub tenant_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl HostResource {
    /// Reference holding only the ID.
    pub fn stub(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            ..Self::default()
        }
    }
}

impl SiteResource {
    pub fn stub(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            ..Self::default()
        }
    }
}

impl RegionResource {
    pub fn stub(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            ..Self::default()
        }
    }
}
