//! REST surface of the single-schedule service.
//!
//! Routes follow the grpc-gateway layout of the inventory API. Errors are
//! rendered by [`ApiError`]'s `IntoResponse`; malformed bodies and query
//! strings are `InvalidArgument` like any other bad input.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequestParts, Path, Query, State,
    },
    http::request::Parts,
    routing::get,
    Json, Router,
};
use prost_types::FieldMask;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::resources::services::{
    CreateSingleScheduleRequest, DeleteSingleScheduleRequest, DeleteSingleScheduleResponse,
    GetSingleScheduleRequest, ListSingleSchedulesRequest, ListSingleSchedulesResponse,
    PatchSingleScheduleRequest, UpdateSingleScheduleRequest,
};
use crate::resources::SingleScheduleResource;
use crate::tenant::{RequestContext, TenantId};
use crate::AppState;

pub const COLLECTION_PATH: &str = "/v1/projects/{project}/schedules/single";
pub const ITEM_PATH: &str = "/v1/projects/{project}/schedules/single/{resource_id}";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(COLLECTION_PATH, get(list_schedules).post(create_schedule))
        .route(
            ITEM_PATH,
            get(get_schedule)
                .put(update_schedule)
                .patch(patch_schedule)
                .delete(delete_schedule),
        )
}

/// Per-request context built from the tenant the middleware resolved and
/// the server's request timeout.
#[derive(Debug)]
pub struct ApiContext(pub RequestContext);

impl FromRequestParts<AppState> for ApiContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ctx = match parts.extensions.get::<TenantId>() {
            Some(tenant) => RequestContext::with_tenant(tenant.as_str()),
            None => RequestContext::anonymous(),
        };
        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(state.config.server.timeout_secs);
        Ok(Self(ctx.with_deadline(deadline)))
    }
}

#[derive(Debug, Deserialize)]
pub struct ProjectPath {
    pub project: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemPath {
    pub project: String,
    pub resource_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PatchParams {
    /// Comma-separated external field names.
    pub field_mask: Option<String>,
}

async fn create_schedule(
    State(state): State<AppState>,
    ApiContext(ctx): ApiContext,
    Path(path): Path<ProjectPath>,
    body: Result<Json<SingleScheduleResource>, JsonRejection>,
) -> ApiResult<Json<SingleScheduleResource>> {
    tracing::debug!(project = %path.project, "POST single schedule");
    let Json(single_schedule) = body?;
    let created = state
        .schedules
        .create_single_schedule(&ctx, CreateSingleScheduleRequest { single_schedule })
        .await?;
    Ok(Json(created))
}

async fn list_schedules(
    State(state): State<AppState>,
    ApiContext(ctx): ApiContext,
    Path(path): Path<ProjectPath>,
    query: Result<Query<ListSingleSchedulesRequest>, QueryRejection>,
) -> ApiResult<Json<ListSingleSchedulesResponse>> {
    tracing::debug!(project = %path.project, "GET single schedules");
    let Query(req) = query?;
    Ok(Json(state.schedules.list_single_schedules(&ctx, req).await?))
}

async fn get_schedule(
    State(state): State<AppState>,
    ApiContext(ctx): ApiContext,
    Path(path): Path<ItemPath>,
) -> ApiResult<Json<SingleScheduleResource>> {
    tracing::debug!(project = %path.project, resource_id = %path.resource_id, "GET single schedule");
    let schedule = state
        .schedules
        .get_single_schedule(
            &ctx,
            GetSingleScheduleRequest {
                resource_id: path.resource_id,
            },
        )
        .await?;
    Ok(Json(schedule))
}

async fn update_schedule(
    State(state): State<AppState>,
    ApiContext(ctx): ApiContext,
    Path(path): Path<ItemPath>,
    body: Result<Json<SingleScheduleResource>, JsonRejection>,
) -> ApiResult<Json<SingleScheduleResource>> {
    tracing::debug!(project = %path.project, resource_id = %path.resource_id, "PUT single schedule");
    let Json(single_schedule) = body?;
    let updated = state
        .schedules
        .update_single_schedule(
            &ctx,
            UpdateSingleScheduleRequest {
                resource_id: path.resource_id,
                single_schedule,
            },
        )
        .await?;
    Ok(Json(updated))
}

async fn patch_schedule(
    State(state): State<AppState>,
    ApiContext(ctx): ApiContext,
    Path(path): Path<ItemPath>,
    params: Result<Query<PatchParams>, QueryRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<SingleScheduleResource>> {
    tracing::debug!(project = %path.project, resource_id = %path.resource_id, "PATCH single schedule");
    let Query(params) = params?;
    let Json(body) = body?;
    let field_mask = patch_mask(params.field_mask.as_deref(), &body);
    let single_schedule: SingleScheduleResource = serde_json::from_value(body)
        .map_err(|e| ApiError::invalid_argument(format!("invalid single schedule body: {e}")))?;

    let patched = state
        .schedules
        .patch_single_schedule(
            &ctx,
            PatchSingleScheduleRequest {
                resource_id: path.resource_id,
                single_schedule,
                field_mask,
            },
        )
        .await?;
    Ok(Json(patched))
}

async fn delete_schedule(
    State(state): State<AppState>,
    ApiContext(ctx): ApiContext,
    Path(path): Path<ItemPath>,
) -> ApiResult<Json<DeleteSingleScheduleResponse>> {
    tracing::debug!(project = %path.project, resource_id = %path.resource_id, "DELETE single schedule");
    let deleted = state
        .schedules
        .delete_single_schedule(
            &ctx,
            DeleteSingleScheduleRequest {
                resource_id: path.resource_id,
            },
        )
        .await?;
    Ok(Json(deleted))
}

/// The explicit `field_mask` query parameter, or else the top-level keys of
/// the body. `None` when neither names a field.
fn patch_mask(explicit: Option<&str>, body: &Value) -> Option<FieldMask> {
    let paths: Vec<String> = match explicit {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_owned)
            .collect(),
        None => body
            .as_object()
            .map(|fields| fields.keys().cloned().collect())
            .unwrap_or_default(),
    };
    (!paths.is_empty()).then_some(FieldMask { paths })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patch_mask_prefers_query() {
        let body = json!({"name": "x", "start_seconds": 10});
        let mask = patch_mask(Some("name, end_seconds,"), &body).unwrap();
        assert_eq!(mask.paths, vec!["name", "end_seconds"]);
    }

    #[test]
    fn test_patch_mask_from_body_keys() {
        let body = json!({"name": "x", "target_site_id": "site-87654321"});
        let mut paths = patch_mask(None, &body).unwrap().paths;
        paths.sort();
        assert_eq!(paths, vec!["name", "target_site_id"]);
    }

    #[test]
    fn test_patch_mask_empty() {
        assert!(patch_mask(None, &json!({})).is_none());
        assert!(patch_mask(Some(""), &json!({"name": "x"})).is_none());
    }
}
