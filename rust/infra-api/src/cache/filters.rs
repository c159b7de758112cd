//! Structured list predicate for schedules.

use crate::error::{ApiError, ApiResult};
use crate::inventory::filter::quote;
use crate::inventory::validate::validate_resource_id;
use crate::inventory::ResourceKind;

/// Optional listing filters. Unlike the write-side target, the target
/// filters are independent: a schedule matches if it targets any of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ScheduleFilters {
    pub host_id: Option<String>,
    pub site_id: Option<String>,
    pub region_id: Option<String>,
    /// Only schedules whose window covers this instant.
    pub unix_epoch: Option<u64>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn parse_id(kind: ResourceKind, value: Option<&str>) -> ApiResult<Option<String>> {
    non_empty(value)
        .map(|id| validate_resource_id(kind, id).map(|()| id.to_owned()))
        .transpose()
}

impl ScheduleFilters {
    /// Build filters from raw query parameters. Empty strings mean "no filter".
    pub fn parse(
        host_id: Option<&str>,
        site_id: Option<&str>,
        region_id: Option<&str>,
        unix_epoch: Option<&str>,
    ) -> ApiResult<Self> {
        let unix_epoch = non_empty(unix_epoch)
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|e| {
                    ApiError::invalid_argument(format!("invalid unix_epoch {raw:?}: {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            host_id: parse_id(ResourceKind::Host, host_id)?,
            site_id: parse_id(ResourceKind::Site, site_id)?,
            region_id: parse_id(ResourceKind::Region, region_id)?,
            unix_epoch,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Render as a store filter expression.
    pub fn to_filter_expression(&self) -> String {
        let targets: Vec<String> = [
            ("target_host", &self.host_id),
            ("target_site", &self.site_id),
            ("target_region", &self.region_id),
        ]
        .into_iter()
        .filter_map(|(edge, id)| {
            id.as_deref()
                .map(|id| format!("{edge}.resource_id = {}", quote(id)))
        })
        .collect();

        let mut clauses = Vec::new();
        match targets.len() {
            0 => {}
            1 => clauses.push(targets.join("")),
            _ => clauses.push(format!("({})", targets.join(" OR "))),
        }
        if let Some(epoch) = self.unix_epoch {
            clauses.push(format!(
                "start_seconds <= {epoch} AND (end_seconds = 0 OR end_seconds > {epoch})"
            ));
        }
        clauses.join(" AND ")
    }

    /// Stable key identifying this filter set within a tenant.
    pub fn cache_key(&self) -> String {
        format!(
            "h={};s={};r={};e={}",
            self.host_id.as_deref().unwrap_or_default(),
            self.site_id.as_deref().unwrap_or_default(),
            self.region_id.as_deref().unwrap_or_default(),
            self.unix_epoch.map(|e| e.to_string()).unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::filter::Expr;

    #[test]
    fn test_empty_filters() {
        let filters = ScheduleFilters::parse(Some(""), None, Some(""), Some("")).unwrap();
        assert!(filters.is_empty());
        assert_eq!(filters.to_filter_expression(), "");
    }

    #[test]
    fn test_single_host_filter() {
        let filters = ScheduleFilters::parse(Some("host-87654321"), None, None, None).unwrap();
        assert_eq!(
            filters.to_filter_expression(),
            r#"target_host.resource_id = "host-87654321""#
        );
    }

    #[test]
    fn test_targets_or_combined_with_epoch() {
        let filters = ScheduleFilters::parse(
            Some("host-87654321"),
            Some("site-87654321"),
            None,
            Some("5000"),
        )
        .unwrap();
        let expr = filters.to_filter_expression();
        assert_eq!(
            expr,
            r#"(target_host.resource_id = "host-87654321" OR target_site.resource_id = "site-87654321") AND start_seconds <= 5000 AND (end_seconds = 0 OR end_seconds > 5000)"#
        );
        Expr::parse(&expr).unwrap();
    }

    #[test]
    fn test_invalid_values() {
        for (h, s, r, e) in [
            (Some("site-87654321"), None, None, None),
            (None, Some("bogus"), None, None),
            (None, None, Some("region-1"), None),
            (None, None, None, Some("yesterday")),
        ] {
            let err = ScheduleFilters::parse(h, s, r, e).unwrap_err();
            assert_eq!(err.code(), tonic::Code::InvalidArgument);
        }
    }

    #[test]
    fn test_cache_key_distinguishes_filters() {
        let a = ScheduleFilters::parse(Some("host-87654321"), None, None, None).unwrap();
        let b = ScheduleFilters::parse(None, Some("site-87654321"), None, None).unwrap();
        assert_ne!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), a.clone().cache_key());
    }
}
