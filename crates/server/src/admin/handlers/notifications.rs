//! Notification hub handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use hotboard_core::notify::Payload;
use tracing::info;

use crate::admin::{
    types::{AdminApiError, BroadcastRequest, BroadcastResponse, NotificationStatsResponse},
    AdminState,
};

/// GET /admin/notifications/stats
#[utoipa::path(
    get,
    path = "/admin/notifications/stats",
    tag = "Notifications",
    responses((status = 200, description = "Live connection counts", body = NotificationStatsResponse))
)]
pub async fn get_stats(State(state): State<AdminState>) -> Json<NotificationStatsResponse> {
    let stats = state.components.hub.stats();
    Json(NotificationStatsResponse { subscribers: stats.subscribers, connections: stats.connections })
}

/// POST /admin/notifications/broadcast
///
/// Sends `message` as a text frame to every live connection.
#[utoipa::path(
    post,
    path = "/admin/notifications/broadcast",
    tag = "Notifications",
    request_body = BroadcastRequest,
    responses(
        (status = 200, description = "Delivery outcome", body = BroadcastResponse),
        (status = 400, description = "Empty message", body = AdminApiError)
    )
)]
pub async fn broadcast(
    State(state): State<AdminState>,
    Json(request): Json<BroadcastRequest>,
) -> impl IntoResponse {
    if request.message.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(AdminApiError::new("message must not be empty")))
            .into_response();
    }
    let report = state.components.hub.broadcast(Payload::from(request.message)).await;
    info!(delivered = report.delivered, dropped = report.dropped, "admin broadcast sent");
    Json(BroadcastResponse { delivered: report.delivered, dropped: report.dropped }).into_response()
}
