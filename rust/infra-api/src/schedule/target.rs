//! The schedule's target: exactly one of host, site or region, or none.

use crate::error::{ApiError, ApiResult};
use crate::inventory::{HostResource, RegionResource, Relation, SiteResource};

/// Target reference as written by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Host(String),
    Site(String),
    Region(String),
}

impl Target {
    /// Build the target from the three flat ID fields of an external
    /// schedule. Empty strings are unset; any other value, including
    /// whitespace, counts as set and is left to schema validation.
    pub fn from_ids(host_id: &str, site_id: &str, region_id: &str) -> ApiResult<Option<Self>> {
        let set = [host_id, site_id, region_id]
            .iter()
            .filter(|id| !id.is_empty())
            .count();
        if set > 1 {
            return Err(ApiError::invalid_argument(
                "only site, host or region target must be provided for schedule resource",
            ));
        }

        Ok(if !host_id.is_empty() {
            Some(Self::Host(host_id.to_owned()))
        } else if !site_id.is_empty() {
            Some(Self::Site(site_id.to_owned()))
        } else if !region_id.is_empty() {
            Some(Self::Region(region_id.to_owned()))
        } else {
            None
        })
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Host(id) | Self::Site(id) | Self::Region(id) => id,
        }
    }

    /// The store edge holding an ID-only stub.
    pub fn into_relation(self) -> Relation {
        match self {
            Self::Host(id) => Relation::TargetHost(HostResource::stub(id)),
            Self::Site(id) => Relation::TargetSite(SiteResource::stub(id)),
            Self::Region(id) => Relation::TargetRegion(RegionResource::stub(id)),
        }
    }
}

impl From<&Relation> for Target {
    fn from(relation: &Relation) -> Self {
        let id = relation.target_id().to_owned();
        match relation {
            Relation::TargetHost(_) => Self::Host(id),
            Relation::TargetSite(_) => Self::Site(id),
            Relation::TargetRegion(_) => Self::Region(id),
        }
    }
}
