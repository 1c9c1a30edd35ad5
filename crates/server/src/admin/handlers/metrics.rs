//! Prometheus exposition.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};

use crate::admin::AdminState;

/// GET /admin/metrics
#[utoipa::path(
    get,
    path = "/admin/metrics",
    tag = "Metrics",
    responses(
        (status = 200, description = "Prometheus text exposition", body = String),
        (status = 404, description = "Metrics disabled")
    )
)]
pub async fn get_metrics(State(state): State<AdminState>) -> impl IntoResponse {
    if !state.components.config.metrics.enabled {
        return StatusCode::NOT_FOUND.into_response();
    }
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.components.metrics.render(),
    )
        .into_response()
}
