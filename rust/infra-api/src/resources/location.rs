//! External location resources.

use serde::{Deserialize, Serialize};

use super::Timestamps;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteResource {
    pub resource_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub region_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub address: String,
    /// Alias of `resource_id`.
    #[serde(rename = "siteID", skip_serializing_if = "String::is_empty")]
    pub site_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Timestamps>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionResource {
    pub resource_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub parent_id: String,
    /// Alias of `resource_id`.
    #[serde(rename = "regionID", skip_serializing_if = "String::is_empty")]
    pub region_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Timestamps>,
}
