//! upwatch-api — REST API for endpoint statuses.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/statuses` | List every cached status |
//! | GET | `/api/v1/statuses/:id` | Get one endpoint's status |
//! | POST | `/api/v1/statuses/refresh` | Run (or join) a refresh pass |
//! | POST | `/api/v1/statuses/:id/manual-test` | Record a manual test result |

pub mod handlers;
pub mod hints;

use axum::Router;
use axum::routing::{get, post};
use upwatch_status::StatusEngine;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub engine: StatusEngine,
}

/// Build the API router.
pub fn build_router(engine: StatusEngine) -> Router {
    let api_state = ApiState { engine };

    let api_routes = Router::new()
        .route("/statuses", get(handlers::list_statuses))
        .route("/statuses/refresh", post(handlers::refresh_statuses))
        .route("/statuses/{id}", get(handlers::get_status))
        .route("/statuses/{id}/manual-test", post(handlers::record_manual_test))
        .with_state(api_state);

    Router::new().nest("/api/v1", api_routes)
}
