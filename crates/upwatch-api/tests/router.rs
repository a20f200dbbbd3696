//! Router-level tests: requests go through axum routing and extraction.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use upwatch_api::build_router;
use upwatch_core::config::StatusConfig;
use upwatch_core::*;
use upwatch_state::StateStore;
use upwatch_status::source::BoxFuture;
use upwatch_status::{SourceResult, StatusEngine, StatusSource};

struct StaticSource;

impl StatusSource for StaticSource {
    fn fetch_config(&self) -> BoxFuture<'_, SourceResult<ConfigSnapshot>> {
        Box::pin(async {
            Ok(ConfigSnapshot {
                endpoints: vec![
                    EndpointConfig {
                        id: "alpha".to_string(),
                        client_type: "claude".to_string(),
                        status: Some("untested".to_string()),
                        is_enabled: true,
                    },
                    EndpointConfig {
                        id: "beta".to_string(),
                        client_type: "codex".to_string(),
                        status: None,
                        is_enabled: false,
                    },
                ],
                health_check_interval_secs: Some(60),
            })
        })
    }

    fn fetch_health_checks(
        &self,
    ) -> BoxFuture<'_, SourceResult<HashMap<EndpointId, HealthCheckRecord>>> {
        Box::pin(async { Ok(HashMap::new()) })
    }

    fn fetch_recent_requests<'a>(
        &'a self,
        _endpoint_id: &'a str,
        _client_type: &'a str,
        _limit: usize,
    ) -> BoxFuture<'a, SourceResult<Vec<RecentRequestSample>>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

fn test_engine() -> StatusEngine {
    StatusEngine::new(
        Arc::new(StaticSource),
        StateStore::open_in_memory().unwrap(),
        StatusConfig::default(),
    )
}

async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn refresh_then_list_statuses() {
    let router = build_router(test_engine());

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/statuses/refresh")
        .body(Body::empty())
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::builder()
        .uri("/api/v1/statuses")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = json_body(resp).await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["endpoint_id"], "alpha");
    assert_eq!(data[0]["status"], "untested");
    assert_eq!(data[1]["endpoint_id"], "beta");
    assert_eq!(data[1]["status"], "disabled");
    assert_eq!(data[1]["hint"]["icon"], "slash");
}

#[tokio::test]
async fn manual_test_round_trip_over_http() {
    let engine = test_engine();
    engine.refresh().await;
    let router = build_router(engine);

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/statuses/alpha/manual-test")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"success":true,"latency_ms":95}"#))
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::builder()
        .uri("/api/v1/statuses/alpha")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = json_body(resp).await;
    assert_eq!(json["data"]["status"], "available");
    assert_eq!(json["data"]["source"], "manual_test");
    assert_eq!(json["data"]["latency_ms"], 95);
}

#[tokio::test]
async fn manual_test_rejects_malformed_body() {
    let engine = test_engine();
    engine.refresh().await;
    let router = build_router(engine);

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/statuses/alpha/manual-test")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"latency_ms":95}"#))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn unknown_status_is_not_found() {
    let router = build_router(test_engine());

    let req = Request::builder()
        .uri("/api/v1/statuses/missing")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
