//! HTTP surface driven in-process through the axum router.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use infra_api::cache::{InMemoryScheduleCache, ScheduleCache};
use infra_api::config::AppConfig;
use infra_api::inventory::{HostResource, InMemoryInventory, InventoryClient, Resource};
use infra_api::schedule::{ScheduleService, ServiceSettings};
use infra_api::server::router;
use infra_api::tenant::RequestContext;
use infra_api::AppState;

const HOST: &str = "host-87654321";
const BASE: &str = "/v1/projects/demo/schedules/single";

async fn app_with(config: AppConfig) -> Router {
    let inventory = Arc::new(InMemoryInventory::new());
    for tenant in ["t1", "t2"] {
        inventory
            .create(
                &RequestContext::with_tenant(tenant),
                Resource::Host(HostResource::stub(HOST)),
            )
            .await
            .unwrap();
    }
    let store: Arc<dyn InventoryClient> = inventory;
    let cache: Arc<dyn ScheduleCache> = Arc::new(InMemoryScheduleCache::new(Arc::clone(&store)));
    let schedules = ScheduleService::new(store, cache, ServiceSettings::from(&config.api));
    router(AppState {
        config: Arc::new(config),
        schedules,
    })
}

async fn app() -> Router {
    app_with(AppConfig::default()).await
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    tenant: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(tenant) = tenant {
        builder = builder.header("ActiveProjectID", tenant);
    }
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn schedule_body() -> Value {
    json!({
        "name": "maint",
        "schedule_status": "SCHEDULE_STATUS_MAINTENANCE",
        "start_seconds": 3600,
        "target_host_id": HOST,
    })
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["cache_backend"], "memory");
}

#[tokio::test]
async fn test_create_get_list_delete() {
    let app = app().await;

    let (status, created) = send(&app, Method::POST, BASE, Some("t1"), Some(schedule_body())).await;
    assert_eq!(status, StatusCode::OK);
    let id = created["resource_id"].as_str().unwrap().to_owned();
    assert_eq!(created["single_scheduleID"], id.as_str());
    assert_eq!(created["target_host"]["resource_id"], HOST);
    assert_eq!(created["target_host_id"], HOST);
    assert_eq!(created["schedule_status"], "SCHEDULE_STATUS_MAINTENANCE");

    let item = format!("{BASE}/{id}");
    let (status, got) = send(&app, Method::GET, &item, Some("t1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(got["name"], "maint");

    let (status, listed) = send(
        &app,
        Method::GET,
        &format!("{BASE}?host_id={HOST}&page_size=10"),
        Some("t1"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total_elements"], 1);
    assert_eq!(listed["has_next"], false);

    let (status, _) = send(&app, Method::DELETE, &item, Some("t1"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, err) = send(&app, Method::GET, &item, Some("t1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "NotFound");
}

#[tokio::test]
async fn test_missing_tenant_is_401() {
    let app = app().await;
    let (status, err) = send(&app, Method::POST, BASE, None, Some(schedule_body())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["code"], "Unauthenticated");
}

#[tokio::test]
async fn test_invalid_window_is_400() {
    let app = app().await;
    let mut body = schedule_body();
    body["start_seconds"] = json!(7200);
    body["end_seconds"] = json!(3600);

    let (status, err) = send(&app, Method::POST, BASE, Some("t1"), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "InvalidArgument");
    assert!(err["message"]
        .as_str()
        .unwrap()
        .contains("end time must be greater than the start time"));
}

#[tokio::test]
async fn test_page_size_above_maximum_is_400() {
    let app = app().await;
    let (status, _) = send(&app, Method::GET, &format!("{BASE}?page_size=1000"), Some("t1"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patch_mask_from_query_and_body() {
    let app = app().await;
    let (_, created) = send(&app, Method::POST, BASE, Some("t1"), Some(schedule_body())).await;
    let item = format!("{BASE}/{}", created["resource_id"].as_str().unwrap());

    // Explicit mask: only `name` changes even though the body carries more.
    let (status, patched) = send(
        &app,
        Method::PATCH,
        &format!("{item}?field_mask=name"),
        Some("t1"),
        Some(json!({"name": "renamed", "start_seconds": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["name"], "renamed");
    assert_eq!(patched["start_seconds"], 3600);

    // No mask: the body's keys are the mask.
    let (status, patched) = send(
        &app,
        Method::PATCH,
        &item,
        Some("t1"),
        Some(json!({"end_seconds": 7200})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["end_seconds"], 7200);
    assert_eq!(patched["name"], "renamed");
    assert_eq!(patched["target_host_id"], HOST);
}

#[tokio::test]
async fn test_other_tenant_sees_nothing() {
    let app = app().await;
    let (_, created) = send(&app, Method::POST, BASE, Some("t1"), Some(schedule_body())).await;
    let item = format!("{BASE}/{}", created["resource_id"].as_str().unwrap());

    let (status, _) = send(&app, Method::GET, &item, Some("t2"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, listed) = send(&app, Method::GET, BASE, Some("t2"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total_elements"], 0);
}

#[cfg(feature = "gateway")]
#[tokio::test]
async fn test_jwt_tenant_overrides_header() {
    use infra_api::gateway::auth::generate_jwt;

    let mut config = AppConfig::default();
    config.gateway.jwt_secret = Some("secret".into());
    let app = app_with(config).await;

    // Header alone is not trusted once a secret is configured.
    let (status, _) = send(&app, Method::POST, BASE, Some("t1"), Some(schedule_body())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = generate_jwt("user-1", Some("t1"), "secret", 60).unwrap();
    let request = Request::builder()
        .method(Method::POST)
        .uri(BASE)
        .header("authorization", format!("Bearer {token}"))
        .header("ActiveProjectID", "t2")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(schedule_body().to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let token = generate_jwt("user-2", Some("t2"), "secret", 60).unwrap();
    let request = Request::builder()
        .method(Method::GET)
        .uri(BASE)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let listed: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(listed["total_elements"], 0);

    let request = Request::builder()
        .method(Method::GET)
        .uri(BASE)
        .header("authorization", "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_body_is_invalid_argument() {
    let app = app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri(BASE)
        .header("ActiveProjectID", "t1")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let err: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(err["code"], "InvalidArgument");

    // No content type at all is still a bad request, not 415.
    let request = Request::builder()
        .method(Method::PATCH)
        .uri(format!("{BASE}/singlesche-0a1b2c3d"))
        .header("ActiveProjectID", "t1")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, err) = send(&app, Method::GET, &format!("{BASE}?page_size=many"), Some("t1"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "InvalidArgument");
}

#[tokio::test]
async fn test_item_routes_only_address_schedules() {
    let app = app().await;

    let (status, err) = send(&app, Method::DELETE, &format!("{BASE}/{HOST}"), Some("t1"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "InvalidArgument");

    // The host is still there to be targeted.
    let (status, _) = send(&app, Method::POST, BASE, Some("t1"), Some(schedule_body())).await;
    assert_eq!(status, StatusCode::OK);
}
