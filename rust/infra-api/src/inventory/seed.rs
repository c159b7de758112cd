//! Startup seeding of the in-memory store with schedule targets.
//!
//! The file (YAML, TOML or JSON, picked by extension) maps tenants to the
//! hosts, sites and regions schedules may reference:
//!
//! ```yaml
//! tenants:
//!   t1:
//!     regions:
//!       - { resource_id: region-87654321, name: us-west }
//!     sites:
//!       - { resource_id: site-87654321, name: sjc, region_id: region-87654321 }
//!     hosts:
//!       - { resource_id: host-87654321, name: edge-01, site_id: site-87654321 }
//! ```

use std::collections::HashMap;

use serde::Deserialize;

use super::{HostResource, InMemoryInventory, InventoryClient, RegionResource, Resource, SiteResource};
use crate::error::{ApiError, ApiResult};
use crate::tenant::RequestContext;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TenantSeed {
    pub regions: Vec<RegionResource>,
    pub sites: Vec<SiteResource>,
    pub hosts: Vec<HostResource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InventorySeed {
    pub tenants: HashMap<String, TenantSeed>,
}

impl InventorySeed {
    pub fn from_file(path: &str) -> ApiResult<Self> {
        config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| ApiError::internal(format!("failed to read inventory seed {path}: {e}")))
    }

    /// Create every seeded resource. Returns how many were created.
    pub async fn apply(self, store: &InMemoryInventory) -> ApiResult<usize> {
        let mut created = 0;
        for (tenant_id, seed) in self.tenants {
            let ctx = RequestContext::with_tenant(tenant_id.as_str());
            let resources = seed
                .regions
                .into_iter()
                .map(Resource::Region)
                .chain(seed.sites.into_iter().map(Resource::Site))
                .chain(seed.hosts.into_iter().map(Resource::Host));
            for resource in resources {
                let stored = store
                    .create(&ctx, resource)
                    .await
                    .map_err(|e| e.wrap(format!("seeding tenant {tenant_id}")))?;
                tracing::debug!(tenant_id = %tenant_id, resource_id = stored.resource_id(), "seeded");
                created += 1;
            }
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_apply_creates_per_tenant() {
        let mut seed = InventorySeed::default();
        seed.tenants.insert(
            "t1".into(),
            TenantSeed {
                hosts: vec![HostResource::stub("host-87654321")],
                sites: vec![SiteResource::stub("site-87654321")],
                ..TenantSeed::default()
            },
        );
        seed.tenants.insert(
            "t2".into(),
            TenantSeed {
                regions: vec![RegionResource::stub("region-87654321")],
                ..TenantSeed::default()
            },
        );

        let store = InMemoryInventory::new();
        assert_eq!(seed.apply(&store).await.unwrap(), 3);
        assert_eq!(store.len("t1").await, 2);
        assert_eq!(store.len("t2").await, 1);

        let ctx = RequestContext::with_tenant("t1");
        let host = store.get(&ctx, "host-87654321").await.unwrap();
        assert_eq!(host.resource_id(), "host-87654321");
    }

    #[tokio::test]
    async fn test_apply_rejects_bad_id() {
        let mut seed = InventorySeed::default();
        seed.tenants.insert(
            "t1".into(),
            TenantSeed {
                hosts: vec![HostResource::stub("host-XYZ")],
                ..TenantSeed::default()
            },
        );
        let err = seed.apply(&InMemoryInventory::new()).await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(InventorySeed::from_file("does/not/exist.yaml").is_err());
    }
}
