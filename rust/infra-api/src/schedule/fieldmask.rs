//! Field masks for schedule updates.
//!
//! Callers name fields by their external JSON names; the store expects
//! internal field and edge names. The mapping is a closed enum so every
//! patchable field has exactly one internal path.

use prost_types::FieldMask;

use crate::error::{ApiError, ApiResult};
use crate::inventory::schedule::{
    EDGE_TARGET_HOST, EDGE_TARGET_REGION, EDGE_TARGET_SITE, FIELD_END_SECONDS, FIELD_NAME,
    FIELD_SCHEDULE_STATUS, FIELD_START_SECONDS,
};

/// Externally patchable schedule fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SingleScheduleField {
    Name,
    ScheduleStatus,
    StartSeconds,
    EndSeconds,
    TargetHostId,
    TargetSiteId,
    TargetRegionId,
}

impl SingleScheduleField {
    pub const ALL: [Self; 7] = [
        Self::Name,
        Self::TargetRegionId,
        Self::TargetSiteId,
        Self::TargetHostId,
        Self::StartSeconds,
        Self::EndSeconds,
        Self::ScheduleStatus,
    ];

    pub fn from_external(path: &str) -> Option<Self> {
        Some(match path {
            "name" => Self::Name,
            "schedule_status" => Self::ScheduleStatus,
            "start_seconds" => Self::StartSeconds,
            "end_seconds" => Self::EndSeconds,
            "target_host_id" => Self::TargetHostId,
            "target_site_id" => Self::TargetSiteId,
            "target_region_id" => Self::TargetRegionId,
            _ => return None,
        })
    }

    pub fn external_name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::ScheduleStatus => "schedule_status",
            Self::StartSeconds => "start_seconds",
            Self::EndSeconds => "end_seconds",
            Self::TargetHostId => "target_host_id",
            Self::TargetSiteId => "target_site_id",
            Self::TargetRegionId => "target_region_id",
        }
    }

    /// Store field (or edge) the external field writes.
    pub fn internal_path(self) -> &'static str {
        match self {
            Self::Name => FIELD_NAME,
            Self::ScheduleStatus => FIELD_SCHEDULE_STATUS,
            Self::StartSeconds => FIELD_START_SECONDS,
            Self::EndSeconds => FIELD_END_SECONDS,
            Self::TargetHostId => EDGE_TARGET_HOST,
            Self::TargetSiteId => EDGE_TARGET_SITE,
            Self::TargetRegionId => EDGE_TARGET_REGION,
        }
    }
}

/// Mask over every mutable field, used by full replacement (PUT).
pub fn full_update_mask() -> FieldMask {
    FieldMask {
        paths: SingleScheduleField::ALL
            .iter()
            .map(|f| f.internal_path().to_owned())
            .collect(),
    }
}

/// Translate a caller-supplied mask to internal paths.
///
/// An absent or empty mask passes through empty, which the store treats as
/// "all mutable fields". Unknown paths are dropped with a warning, or
/// rejected when `strict` is set. A non-empty mask that maps to nothing is
/// rejected rather than widened into a full update.
pub fn translate_mask(mask: Option<&FieldMask>, strict: bool) -> ApiResult<FieldMask> {
    let Some(mask) = mask.filter(|m| !m.paths.is_empty()) else {
        return Ok(FieldMask::default());
    };

    let mut paths: Vec<String> = Vec::with_capacity(mask.paths.len());
    for path in &mask.paths {
        match SingleScheduleField::from_external(path) {
            Some(field) => {
                let internal = field.internal_path();
                if !paths.iter().any(|p| p == internal) {
                    paths.push(internal.to_owned());
                }
            }
            None if strict => {
                return Err(ApiError::invalid_argument(format!(
                    "field mask path {path:?} is not a patchable single schedule field"
                )));
            }
            None => {
                tracing::warn!(path = %path, "Field not found in single schedule fields map, dropping");
            }
        }
    }

    if paths.is_empty() {
        return Err(ApiError::invalid_argument(
            "field mask does not name any patchable single schedule field",
        ));
    }
    tracing::debug!(?paths, "translated single schedule field mask");
    Ok(FieldMask { paths })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(paths: &[&str]) -> FieldMask {
        FieldMask {
            paths: paths.iter().map(|p| (*p).to_owned()).collect(),
        }
    }

    #[test]
    fn test_every_field_round_trips() {
        for field in SingleScheduleField::ALL {
            assert_eq!(
                SingleScheduleField::from_external(field.external_name()),
                Some(field)
            );
        }
    }

    #[test]
    fn test_full_mask_lists_all_mutable_fields() {
        let full = full_update_mask();
        assert_eq!(full.paths.len(), 7);
        for path in crate::inventory::schedule::MUTABLE_FIELDS {
            assert!(full.paths.iter().any(|p| p == path), "{path}");
        }
    }

    #[test]
    fn test_translate_maps_and_drops() {
        let out = translate_mask(
            Some(&mask(&["name", "target_site_id", "colour", "name"])),
            false,
        )
        .unwrap();
        assert_eq!(out.paths, vec!["name", "target_site"]);
    }

    #[test]
    fn test_translate_strict_rejects_unknown() {
        let err = translate_mask(Some(&mask(&["name", "colour"])), true).unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn test_translate_empty_passes_through() {
        assert!(translate_mask(None, true).unwrap().paths.is_empty());
        assert!(translate_mask(Some(&mask(&[])), false).unwrap().paths.is_empty());
    }

    #[test]
    fn test_translate_all_unknown_rejected() {
        let err = translate_mask(Some(&mask(&["colour"])), false).unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }
}
