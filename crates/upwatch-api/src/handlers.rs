//! REST API handlers.
//!
//! Reads come straight from the engine's cache; only `refresh` and
//! `manual-test` reach the upstream or the side store.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use upwatch_core::{EndpointId, StatusRecord};
use upwatch_status::StatusSnapshot;

use crate::ApiState;
use crate::hints::{StatusHint, hint_for};

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }

    /// Failure that still carries usable data.
    fn degraded(data: T, error: String) -> Json<Self> {
        Json(Self {
            success: false,
            data: Some(data),
            error: Some(error),
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// One endpoint's status as served to clients.
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub endpoint_id: EndpointId,
    #[serde(flatten)]
    pub record: StatusRecord,
    pub hint: StatusHint,
}

impl StatusView {
    fn new(endpoint_id: &str, record: StatusRecord) -> Self {
        let hint = hint_for(record.status, record.source);
        Self {
            endpoint_id: endpoint_id.to_string(),
            record,
            hint,
        }
    }
}

/// Views sorted by endpoint id.
fn views(snapshot: &StatusSnapshot) -> Vec<StatusView> {
    let mut views: Vec<StatusView> = snapshot
        .iter()
        .map(|(id, record)| StatusView::new(id, record.clone()))
        .collect();
    views.sort_by(|a, b| a.endpoint_id.cmp(&b.endpoint_id));
    views
}

// ── Statuses ───────────────────────────────────────────────────

/// GET /api/v1/statuses
pub async fn list_statuses(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(views(&state.engine.get_all_statuses()))
}

/// GET /api/v1/statuses/:id
pub async fn get_status(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.engine.get_status(&id) {
        Some(record) => ApiResponse::ok(StatusView::new(&id, record)).into_response(),
        None => error_response("endpoint not found", StatusCode::NOT_FOUND).into_response(),
    }
}

/// POST /api/v1/statuses/refresh
pub async fn refresh_statuses(State(state): State<ApiState>) -> impl IntoResponse {
    let report = state.engine.refresh().await;
    let data = views(&report.statuses);
    match &report.error {
        None => ApiResponse::ok(data).into_response(),
        Some(e) => {
            warn!(error = %e, "refresh requested over API failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse::degraded(data, e.to_string()),
            )
                .into_response()
        }
    }
}

// ── Manual tests ───────────────────────────────────────────────

/// Manual test request body.
#[derive(Debug, Deserialize)]
pub struct ManualTestRequest {
    pub success: bool,
    #[serde(default)]
    pub latency_ms: Option<u64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// POST /api/v1/statuses/:id/manual-test
pub async fn record_manual_test(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<ManualTestRequest>,
) -> impl IntoResponse {
    if state.engine.get_status(&id).is_none() {
        return error_response("endpoint not found", StatusCode::NOT_FOUND).into_response();
    }

    match state
        .engine
        .record_manual_test(&id, req.success, req.latency_ms, req.error_message)
    {
        Ok(record) => {
            info!(endpoint_id = %id, success = req.success, "manual test recorded over API");
            ApiResponse::ok(StatusView::new(&id, record)).into_response()
        }
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}
