//! System status handler.

use axum::{extract::State, Json};

use crate::admin::{types::SystemStatus, AdminState};

/// GET /admin/system/status
#[utoipa::path(
    get,
    path = "/admin/system/status",
    tag = "System",
    responses((status = 200, description = "Instance status", body = SystemStatus))
)]
pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let components = &state.components;
    Json(SystemStatus {
        version: format!("v{}", state.version),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        cache_backend: components.cache.backend().to_string(),
        top_n: components.refresher.top_n(),
        default_ranking: components.config.ranking.default_kind.to_string(),
        live_connections: components.hub.connection_count(),
    })
}
